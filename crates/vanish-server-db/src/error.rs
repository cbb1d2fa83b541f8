// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Timed out after {elapsed:?}: {operation}")]
	Timeout {
		operation: &'static str,
		elapsed: Duration,
	},

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Migration failed: {0}")]
	Migration(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
