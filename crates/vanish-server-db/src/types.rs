// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;

/// A secret row as persisted in the `secrets` table.
///
/// `ciphertext` is the sealed payload; it is empty once the row has been
/// scrubbed by [`SecretStore::purge_expired_before`](crate::SecretStore::purge_expired_before).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
	pub secret_key: String,
	pub ciphertext: String,
	pub passphrase_digest: Option<String>,
	pub accessed: bool,
	pub deleted: bool,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}

	/// A record is readable only while it is unread, undeleted and unexpired.
	pub fn is_readable(&self, now: DateTime<Utc>) -> bool {
		!self.accessed && !self.deleted && !self.is_expired(now)
	}
}

/// Fields supplied by the caller when creating a secret.
#[derive(Debug, Clone)]
pub struct NewSecret {
	pub secret_key: String,
	pub ciphertext: String,
	pub passphrase_digest: Option<String>,
	pub expires_at: DateTime<Utc>,
}

/// Result of a conditional one-way flag update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
	/// This call performed the transition.
	Applied,
	/// The row exists but the transition was already made (or is no longer
	/// applicable, e.g. reading a deleted secret).
	AlreadySet,
	/// No row with that key.
	Missing,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that SQL
/// string comparison matches chronological order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}
