// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::CacheResult;

/// Best-effort accelerator for secret lifecycle state.
///
/// Every operation touches only the entry for `key`. Nothing here is
/// consistent with the durable store; absence never means "does not exist".
#[async_trait]
pub trait VolatileStore: Send + Sync {
	/// Store `entry` under `key`, replacing any prior entry. The effective TTL
	/// is `max(ttl, floor)`.
	async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> CacheResult<()>;

	/// Return the entry if present and not past its own deadline. An entry
	/// past its deadline is evicted.
	async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

	/// Remove the entry. Idempotent.
	async fn delete(&self, key: &str) -> CacheResult<()>;

	/// Atomically replace the entry with `replacement` iff the current entry
	/// equals `expected`. The entry keeps its existing deadline.
	///
	/// Returns `false` when the entry changed, expired or is absent.
	async fn compare_and_set(
		&self,
		key: &str,
		expected: &CacheEntry,
		replacement: CacheEntry,
	) -> CacheResult<bool>;
}

/// `max(requested, floor)`.
pub fn effective_ttl(requested: Duration, floor: Duration) -> Duration {
	requested.max(floor)
}
