// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pool helpers for tests in this and downstream crates.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::pool::run_migrations;

/// A single-connection in-memory pool with the full schema applied.
///
/// The pool is pinned to one connection that never idles out, since each
/// SQLite `:memory:` connection is its own database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str("sqlite::memory:")
		.expect("valid in-memory url")
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");

	run_migrations(&pool)
		.await
		.expect("Failed to run migrations");
	pool
}
