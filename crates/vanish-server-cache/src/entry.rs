// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a secret's live lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	pub ciphertext: String,
	pub passphrase_digest: Option<String>,
	pub accessed: bool,
	pub deleted: bool,
	pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
	pub fn new(
		ciphertext: String,
		passphrase_digest: Option<String>,
		expires_at: DateTime<Utc>,
	) -> Self {
		Self {
			ciphertext,
			passphrase_digest,
			accessed: false,
			deleted: false,
			expires_at,
		}
	}

	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}

	/// Whether this snapshot still permits a read at `now`.
	pub fn is_readable(&self, now: DateTime<Utc>) -> bool {
		!self.accessed && !self.deleted && !self.is_expired(now)
	}

	pub fn with_accessed(&self) -> Self {
		Self {
			accessed: true,
			..self.clone()
		}
	}

	pub fn with_deleted(&self) -> Self {
		Self {
			deleted: true,
			..self.clone()
		}
	}
}
