// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use vanish_common_secret::key_prefix;

use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Emits each entry as an `info` event on the `audit` target.
///
/// Only the key prefix is logged.
pub struct TracingAuditSink {
	name: String,
}

impl TracingAuditSink {
	pub fn new() -> Self {
		Self {
			name: "tracing".to_string(),
		}
	}
}

impl Default for TracingAuditSink {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		::tracing::info!(
			target: "audit",
			audit_id = %entry.id,
			action = %entry.action,
			key = %key_prefix(&entry.secret_key),
			ip_address = ?entry.ip_address,
			user_agent = ?entry.user_agent,
			details = %entry.details,
			"secret audit event"
		);
		Ok(())
	}
}
