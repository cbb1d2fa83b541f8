// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::SqlitePool;

use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Appends entries to the `secret_logs` table.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	name: String,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let additional_data = if entry.details.is_null() {
			None
		} else {
			Some(serde_json::to_string(&entry.details).map_err(|e| {
				AuditSinkError::Permanent(format!("failed to serialize details: {e}"))
			})?)
		};

		sqlx::query(
			r#"
			INSERT INTO secret_logs (
				id, secret_key, action, ip_address, user_agent, additional_data, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(&entry.secret_key)
		.bind(entry.action.as_str())
		.bind(&entry.ip_address)
		.bind(&entry.user_agent)
		.bind(&additional_data)
		.bind(entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1 FROM secret_logs LIMIT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked")
		}
		_ => false,
	}
}
