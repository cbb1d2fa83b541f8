// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_URL: &str = "sqlite:./vanish.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
	/// Upper bound on any single durable operation.
	pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		DatabaseConfigLayer::default().finalize()
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub busy_timeout_ms: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.busy_timeout_ms.is_some() {
			self.busy_timeout_ms = other.busy_timeout_ms;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
			busy_timeout: Duration::from_millis(
				self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
			),
		}
	}
}
