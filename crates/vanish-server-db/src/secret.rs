// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret repository for database operations.
//!
//! Rows are never physically removed. The only mutations after insert are the
//! one-way `accessed` and `deleted` flips, each done with a conditional update
//! whose affected-row count tells the caller whether it won the transition.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use vanish_common_secret::key_prefix;
use vanish_server_config::DatabaseConfig;

use crate::error::DbError;
use crate::types::{format_timestamp, parse_timestamp, MarkOutcome, NewSecret, SecretRecord};

#[async_trait]
pub trait SecretStore: Send + Sync {
	async fn insert(&self, secret: &NewSecret) -> Result<SecretRecord, DbError>;
	async fn find_by_key(&self, secret_key: &str) -> Result<Option<SecretRecord>, DbError>;
	async fn mark_accessed(&self, secret_key: &str) -> Result<MarkOutcome, DbError>;
	async fn mark_deleted(&self, secret_key: &str) -> Result<MarkOutcome, DbError>;
	async fn purge_expired_before(&self, now: DateTime<Utc>) -> Result<u64, DbError>;
}

#[async_trait]
impl SecretStore for SecretRepository {
	async fn insert(&self, secret: &NewSecret) -> Result<SecretRecord, DbError> {
		self.insert(secret).await
	}

	async fn find_by_key(&self, secret_key: &str) -> Result<Option<SecretRecord>, DbError> {
		self.find_by_key(secret_key).await
	}

	async fn mark_accessed(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		self.mark_accessed(secret_key).await
	}

	async fn mark_deleted(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		self.mark_deleted(secret_key).await
	}

	async fn purge_expired_before(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		self.purge_expired_before(now).await
	}
}

/// Repository for secret rows.
///
/// Every statement is bounded by `timeout`; an elapsed timer surfaces as
/// [`DbError::Timeout`], never as an absent row.
#[derive(Clone)]
pub struct SecretRepository {
	pool: SqlitePool,
	timeout: Duration,
}

impl SecretRepository {
	/// Create a repository using the default operation timeout.
	pub fn new(pool: SqlitePool) -> Self {
		Self::with_timeout(pool, DatabaseConfig::default().busy_timeout)
	}

	pub fn with_timeout(pool: SqlitePool, timeout: Duration) -> Self {
		Self { pool, timeout }
	}

	pub fn from_config(pool: SqlitePool, config: &DatabaseConfig) -> Self {
		Self::with_timeout(pool, config.busy_timeout)
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	async fn bounded<T, E, F>(&self, operation: &'static str, fut: F) -> Result<T, DbError>
	where
		F: Future<Output = Result<T, E>>,
		E: Into<DbError>,
	{
		match tokio::time::timeout(self.timeout, fut).await {
			Ok(result) => result.map_err(Into::into),
			Err(_) => {
				tracing::warn!(
					operation,
					timeout_ms = self.timeout.as_millis() as u64,
					"durable operation timed out"
				);
				Err(DbError::Timeout {
					operation,
					elapsed: self.timeout,
				})
			}
		}
	}

	/// Insert a new secret row with both flags cleared.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if `secret_key` already exists.
	#[tracing::instrument(skip(self, secret), fields(key = %key_prefix(&secret.secret_key)))]
	pub async fn insert(&self, secret: &NewSecret) -> Result<SecretRecord, DbError> {
		let now = Utc::now();
		let stamp = format_timestamp(now);

		self
			.bounded(
				"insert",
				async {
					sqlx::query(
						r#"
						INSERT INTO secrets (
							secret_key, ciphertext, passphrase_digest, accessed, deleted,
							expires_at, created_at, updated_at
						) VALUES (?, ?, ?, 0, 0, ?, ?, ?)
						"#,
					)
					.bind(&secret.secret_key)
					.bind(&secret.ciphertext)
					.bind(&secret.passphrase_digest)
					.bind(format_timestamp(secret.expires_at))
					.bind(&stamp)
					.bind(&stamp)
					.execute(&self.pool)
					.await
					.map_err(|e| match e {
						sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
							DbError::Conflict("Secret key already exists".to_string())
						}
						_ => DbError::Sqlx(e),
					})
				},
			)
			.await?;

		tracing::debug!(key = %key_prefix(&secret.secret_key), "secret row inserted");
		Ok(SecretRecord {
			secret_key: secret.secret_key.clone(),
			ciphertext: secret.ciphertext.clone(),
			passphrase_digest: secret.passphrase_digest.clone(),
			accessed: false,
			deleted: false,
			expires_at: secret.expires_at,
			created_at: now,
			updated_at: now,
		})
	}

	/// Get a secret row by key.
	///
	/// # Returns
	/// `None` if no row exists. Read, deleted and expired rows are returned
	/// as-is; the caller decides what they mean.
	#[tracing::instrument(skip(self, secret_key), fields(key = %key_prefix(secret_key)))]
	pub async fn find_by_key(&self, secret_key: &str) -> Result<Option<SecretRecord>, DbError> {
		let row = self
			.bounded(
				"find_by_key",
				sqlx::query(
					r#"
					SELECT secret_key, ciphertext, passphrase_digest, accessed, deleted,
					       expires_at, created_at, updated_at
					FROM secrets
					WHERE secret_key = ?
					"#,
				)
				.bind(secret_key)
				.fetch_optional(&self.pool),
			)
			.await?;

		row.map(|row| parse_secret_row(&row)).transpose()
	}

	/// Flip `accessed` from false to true.
	///
	/// Only an unread, undeleted row transitions. Anything else that exists
	/// reports `AlreadySet`, so a concurrent reader or deleter is observed as
	/// a lost race rather than a success.
	#[tracing::instrument(skip(self, secret_key), fields(key = %key_prefix(secret_key)))]
	pub async fn mark_accessed(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		let result = self
			.bounded(
				"mark_accessed",
				sqlx::query(
					r#"
					UPDATE secrets
					SET accessed = 1, updated_at = ?
					WHERE secret_key = ? AND accessed = 0 AND deleted = 0
					"#,
				)
				.bind(format_timestamp(Utc::now()))
				.bind(secret_key)
				.execute(&self.pool),
			)
			.await?;

		let outcome = self
			.outcome_for("mark_accessed", secret_key, result.rows_affected())
			.await?;
		tracing::debug!(key = %key_prefix(secret_key), ?outcome, "mark accessed");
		Ok(outcome)
	}

	/// Flip `deleted` from false to true. Read or expired rows may still be
	/// deleted.
	#[tracing::instrument(skip(self, secret_key), fields(key = %key_prefix(secret_key)))]
	pub async fn mark_deleted(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		let result = self
			.bounded(
				"mark_deleted",
				sqlx::query(
					r#"
					UPDATE secrets
					SET deleted = 1, updated_at = ?
					WHERE secret_key = ? AND deleted = 0
					"#,
				)
				.bind(format_timestamp(Utc::now()))
				.bind(secret_key)
				.execute(&self.pool),
			)
			.await?;

		let outcome = self
			.outcome_for("mark_deleted", secret_key, result.rows_affected())
			.await?;
		tracing::debug!(key = %key_prefix(secret_key), ?outcome, "mark deleted");
		Ok(outcome)
	}

	/// Scrub the ciphertext of every row that can no longer be read.
	///
	/// Rows are kept for history; only the sealed payload is cleared.
	///
	/// # Returns
	/// The number of rows scrubbed.
	#[tracing::instrument(skip(self))]
	pub async fn purge_expired_before(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		let stamp = format_timestamp(now);
		let result = self
			.bounded(
				"purge_expired_before",
				sqlx::query(
					r#"
					UPDATE secrets
					SET ciphertext = '', updated_at = ?
					WHERE ciphertext != ''
					  AND (expires_at <= ? OR accessed = 1 OR deleted = 1)
					"#,
				)
				.bind(&stamp)
				.bind(&stamp)
				.execute(&self.pool),
			)
			.await?;

		let purged = result.rows_affected();
		if purged > 0 {
			tracing::info!(purged, "scrubbed unreadable secrets");
		}
		Ok(purged)
	}

	async fn outcome_for(
		&self,
		operation: &'static str,
		secret_key: &str,
		rows_affected: u64,
	) -> Result<MarkOutcome, DbError> {
		if rows_affected > 0 {
			return Ok(MarkOutcome::Applied);
		}

		let exists = self
			.bounded(
				operation,
				sqlx::query("SELECT 1 FROM secrets WHERE secret_key = ?")
					.bind(secret_key)
					.fetch_optional(&self.pool),
			)
			.await?
			.is_some();

		Ok(if exists {
			MarkOutcome::AlreadySet
		} else {
			MarkOutcome::Missing
		})
	}
}

fn parse_secret_row(row: &sqlx::sqlite::SqliteRow) -> Result<SecretRecord, DbError> {
	let secret_key: String = row.get("secret_key");
	let ciphertext: String = row.get("ciphertext");
	let passphrase_digest: Option<String> = row.get("passphrase_digest");
	let accessed: i64 = row.get("accessed");
	let deleted: i64 = row.get("deleted");
	let expires_at_str: String = row.get("expires_at");
	let created_at_str: String = row.get("created_at");
	let updated_at_str: String = row.get("updated_at");

	Ok(SecretRecord {
		secret_key,
		ciphertext,
		passphrase_digest,
		accessed: accessed != 0,
		deleted: deleted != 0,
		expires_at: parse_timestamp("expires_at", &expires_at_str)?,
		created_at: parse_timestamp("created_at", &created_at_str)?,
		updated_at: parse_timestamp("updated_at", &updated_at_str)?,
	})
}
