// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process volatile store.
//!
//! A single mutex guards the map, so `compare_and_set` is atomic per key and
//! two readers can never both observe `accessed = false` and both win.
//!
//! Entries are also indexed by deadline. At capacity one insert evicts at
//! most one entry (the one closest to its deadline, which is an expired one
//! if any exist), and the sweeper pops expired entries off the front of the
//! index instead of scanning the map.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};
use vanish_server_config::CacheConfig;

use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};
use crate::store::{effective_ttl, VolatileStore};

/// Shortest period the background sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
struct Slot {
	entry: CacheEntry,
	deadline: Instant,
}

#[derive(Debug, Default)]
struct Entries {
	slots: HashMap<String, Slot>,
	by_deadline: BTreeSet<(Instant, String)>,
}

impl Entries {
	fn insert(&mut self, key: &str, slot: Slot) {
		let deadline = slot.deadline;
		if let Some(previous) = self.slots.insert(key.to_string(), slot) {
			self.by_deadline.remove(&(previous.deadline, key.to_string()));
		}
		self.by_deadline.insert((deadline, key.to_string()));
	}

	fn remove(&mut self, key: &str) -> Option<Slot> {
		let slot = self.slots.remove(key)?;
		self.by_deadline.remove(&(slot.deadline, key.to_string()));
		Some(slot)
	}

	/// Live slot for `key`; an expired one is dropped.
	fn live_mut(&mut self, key: &str, now: Instant) -> Option<&mut Slot> {
		let expired = self.slots.get(key)?.deadline <= now;
		if expired {
			self.remove(key);
			return None;
		}
		self.slots.get_mut(key)
	}

	fn pop_earliest(&mut self) -> Option<(Instant, String)> {
		let (deadline, key) = self.by_deadline.pop_first()?;
		self.slots.remove(&key);
		Some((deadline, key))
	}

	fn purge_expired(&mut self, now: Instant) -> usize {
		let mut removed = 0;
		while let Some((deadline, _)) = self.by_deadline.first() {
			if *deadline > now {
				break;
			}
			self.pop_earliest();
			removed += 1;
		}
		removed
	}
}

#[derive(Debug)]
pub struct InMemoryCache {
	entries: Mutex<Entries>,
	min_ttl: Duration,
	max_entries: usize,
}

impl InMemoryCache {
	pub fn new(min_ttl: Duration, max_entries: usize) -> Self {
		Self {
			entries: Mutex::new(Entries::default()),
			min_ttl,
			max_entries: max_entries.max(1),
		}
	}

	pub fn from_config(config: &CacheConfig) -> Self {
		Self::new(config.min_ttl, config.max_entries)
	}

	pub fn min_ttl(&self) -> Duration {
		self.min_ttl
	}

	pub async fn len(&self) -> usize {
		self.entries.lock().await.slots.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.lock().await.slots.is_empty()
	}

	/// Drop every entry past its deadline. Returns how many were removed.
	pub async fn purge_expired(&self) -> usize {
		let now = Instant::now();
		self.entries.lock().await.purge_expired(now)
	}

	/// Periodically purge expired entries until the cache is dropped.
	///
	/// Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it.
	pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
		let interval = if interval < MIN_SWEEP_INTERVAL {
			warn!(?interval, "cache sweep interval too short, using minimum");
			MIN_SWEEP_INTERVAL
		} else {
			interval
		};

		let weak: Weak<Self> = Arc::downgrade(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await;
			loop {
				ticker.tick().await;
				let Some(cache) = weak.upgrade() else {
					break;
				};
				let removed = cache.purge_expired().await;
				if removed > 0 {
					debug!(removed, "purged expired cache entries");
				}
			}
		})
	}
}

#[async_trait]
impl VolatileStore for InMemoryCache {
	#[instrument(skip_all)]
	async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) -> CacheResult<()> {
		let now = Instant::now();
		let ttl = effective_ttl(ttl, self.min_ttl);
		let deadline = now.checked_add(ttl).ok_or(CacheError::InvalidTtl(ttl))?;
		let mut entries = self.entries.lock().await;

		if !entries.slots.contains_key(key) && entries.slots.len() >= self.max_entries {
			if let Some((victim_deadline, _)) = entries.pop_earliest() {
				trace!(expired = victim_deadline <= now, "evicted cache entry at capacity");
			}
		}

		entries.insert(key, Slot { entry, deadline });
		Ok(())
	}

	#[instrument(skip_all)]
	async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
		let now = Instant::now();
		let mut entries = self.entries.lock().await;
		let entry = entries.live_mut(key, now).map(|slot| slot.entry.clone());
		Ok(entry)
	}

	#[instrument(skip_all)]
	async fn delete(&self, key: &str) -> CacheResult<()> {
		self.entries.lock().await.remove(key);
		Ok(())
	}

	#[instrument(skip_all)]
	async fn compare_and_set(
		&self,
		key: &str,
		expected: &CacheEntry,
		replacement: CacheEntry,
	) -> CacheResult<bool> {
		let now = Instant::now();
		let mut entries = self.entries.lock().await;

		match entries.live_mut(key, now) {
			Some(slot) if &slot.entry == expected => {
				slot.entry = replacement;
				Ok(true)
			}
			_ => Ok(false),
		}
	}
}
