// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Volatile cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_MIN_TTL_SECS: u64 = 300;
const DEFAULT_MAX_ENTRIES: usize = 100_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
	/// Floor applied to every entry's TTL.
	pub min_ttl: Duration,
	pub max_entries: usize,
	pub sweep_interval: Duration,
}

impl Default for CacheConfig {
	fn default() -> Self {
		CacheConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfigLayer {
	#[serde(default)]
	pub min_ttl_secs: Option<u64>,
	#[serde(default)]
	pub max_entries: Option<usize>,
	#[serde(default)]
	pub sweep_interval_secs: Option<u64>,
}

impl CacheConfigLayer {
	pub fn merge(&mut self, other: CacheConfigLayer) {
		if other.min_ttl_secs.is_some() {
			self.min_ttl_secs = other.min_ttl_secs;
		}
		if other.max_entries.is_some() {
			self.max_entries = other.max_entries;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
	}

	pub fn finalize(self) -> CacheConfig {
		CacheConfig {
			min_ttl: Duration::from_secs(self.min_ttl_secs.unwrap_or(DEFAULT_MIN_TTL_SECS)),
			max_entries: self.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
			sweep_interval: Duration::from_secs(
				self.sweep_interval_secs.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
			),
		}
	}
}
