// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;

#[cfg(feature = "sink-sqlite")]
pub mod sqlite;

#[cfg(feature = "sink-tracing")]
pub mod tracing;

/// A destination for audit entries.
///
/// Sinks run off the request path; a failed publish is logged by the
/// pipeline and otherwise ignored.
#[async_trait]
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError>;

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		Ok(())
	}
}
