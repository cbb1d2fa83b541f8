// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret lifecycle policy.

use serde::Deserialize;

const DEFAULT_TTL_SECS: u64 = 86_400;
const DEFAULT_MAX_SECRET_BYTES: usize = 64 * 1024;

/// Hard ceiling on any TTL so expiry timestamps stay within four-digit years.
pub const ABSOLUTE_MAX_TTL_SECS: u64 = 100 * 365 * 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsConfig {
	/// TTL applied when the creator does not supply one.
	pub default_ttl_secs: u64,
	/// Upper bound on a requested TTL. `None` means unbounded.
	pub max_ttl_secs: Option<u64>,
	/// Largest accepted plaintext, in bytes.
	pub max_secret_bytes: usize,
	/// When set, a failed durable `accessed` write on the cache read path
	/// fails the read instead of being logged and ignored.
	pub require_durable_read_mark: bool,
}

impl Default for SecretsConfig {
	fn default() -> Self {
		SecretsConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsConfigLayer {
	#[serde(default)]
	pub default_ttl_secs: Option<u64>,
	#[serde(default)]
	pub max_ttl_secs: Option<u64>,
	#[serde(default)]
	pub max_secret_bytes: Option<usize>,
	#[serde(default)]
	pub require_durable_read_mark: Option<bool>,
}

impl SecretsConfigLayer {
	pub fn merge(&mut self, other: SecretsConfigLayer) {
		if other.default_ttl_secs.is_some() {
			self.default_ttl_secs = other.default_ttl_secs;
		}
		if other.max_ttl_secs.is_some() {
			self.max_ttl_secs = other.max_ttl_secs;
		}
		if other.max_secret_bytes.is_some() {
			self.max_secret_bytes = other.max_secret_bytes;
		}
		if other.require_durable_read_mark.is_some() {
			self.require_durable_read_mark = other.require_durable_read_mark;
		}
	}

	pub fn finalize(self) -> SecretsConfig {
		SecretsConfig {
			default_ttl_secs: self.default_ttl_secs.unwrap_or(DEFAULT_TTL_SECS),
			max_ttl_secs: self.max_ttl_secs,
			max_secret_bytes: self.max_secret_bytes.unwrap_or(DEFAULT_MAX_SECRET_BYTES),
			require_durable_read_mark: self.require_durable_read_mark.unwrap_or(true),
		}
	}
}
