// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;
use vanish_server_config::DatabaseConfig;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_secrets",
		include_str!("../migrations/001_create_secrets.sql"),
	),
	(
		"002_create_secret_logs",
		include_str!("../migrations/002_create_secret_logs.sql"),
	),
];

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `config` - Database section of the server configuration
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(config), fields(busy_timeout_ms = config.busy_timeout.as_millis() as u64))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(&config.url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(config.busy_timeout)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Run all schema migrations.
///
/// Every statement is `CREATE ... IF NOT EXISTS`, so this is safe to call on
/// every startup.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt)
				.execute(pool)
				.await
				.map_err(|e| DbError::Migration(format!("{name}: {e}")))?;
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}
