// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use vanish_server_audit::{
	AuditLogEntry, AuditService, AuditSink, AuditSinkError, QueueOverflowPolicy,
};
use vanish_server_cache::{CacheEntry, CacheError, CacheResult, InMemoryCache, VolatileStore};
use vanish_server_config::{CryptoConfig, SecretsConfig};
use vanish_server_crypto::{Cipher, HashParams};
use vanish_server_db::{
	testing::create_test_pool, DbError, MarkOutcome, NewSecret, SecretRecord, SecretRepository,
	SecretStore,
};
use vanish_server_secrets::SecretService;

pub const CACHE_FLOOR: Duration = Duration::from_secs(300);

#[derive(Default)]
pub struct RecordingSink {
	entries: Mutex<Vec<AuditLogEntry>>,
}

impl RecordingSink {
	pub fn entries(&self) -> Vec<AuditLogEntry> {
		self.entries.lock().unwrap().clone()
	}

	/// Poll until at least `n` entries arrived or a second passes.
	pub async fn wait_for(&self, n: usize) -> Vec<AuditLogEntry> {
		for _ in 0..100 {
			let entries = self.entries();
			if entries.len() >= n {
				return entries;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		self.entries()
	}
}

#[async_trait]
impl AuditSink for RecordingSink {
	fn name(&self) -> &str {
		"recording"
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		self.entries.lock().unwrap().push((*entry).clone());
		Ok(())
	}
}

/// Durable store whose operations can be switched to fail.
pub struct FlakyStore {
	inner: SecretRepository,
	pub fail_find: AtomicBool,
	pub fail_mark_accessed: AtomicBool,
	pub fail_mark_deleted: AtomicBool,
}

impl FlakyStore {
	pub fn new(inner: SecretRepository) -> Self {
		Self {
			inner,
			fail_find: AtomicBool::new(false),
			fail_mark_accessed: AtomicBool::new(false),
			fail_mark_deleted: AtomicBool::new(false),
		}
	}

	fn check(flag: &AtomicBool, operation: &'static str) -> Result<(), DbError> {
		if flag.load(Ordering::SeqCst) {
			Err(DbError::Timeout {
				operation,
				elapsed: Duration::from_millis(1),
			})
		} else {
			Ok(())
		}
	}
}

#[async_trait]
impl SecretStore for FlakyStore {
	async fn insert(&self, secret: &NewSecret) -> Result<SecretRecord, DbError> {
		self.inner.insert(secret).await
	}

	async fn find_by_key(&self, secret_key: &str) -> Result<Option<SecretRecord>, DbError> {
		Self::check(&self.fail_find, "find_by_key")?;
		self.inner.find_by_key(secret_key).await
	}

	async fn mark_accessed(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		Self::check(&self.fail_mark_accessed, "mark_accessed")?;
		self.inner.mark_accessed(secret_key).await
	}

	async fn mark_deleted(&self, secret_key: &str) -> Result<MarkOutcome, DbError> {
		Self::check(&self.fail_mark_deleted, "mark_deleted")?;
		self.inner.mark_deleted(secret_key).await
	}

	async fn purge_expired_before(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		self.inner.purge_expired_before(now).await
	}
}

/// A cache that is always down.
pub struct UnavailableCache;

#[async_trait]
impl VolatileStore for UnavailableCache {
	async fn set(&self, _key: &str, _entry: CacheEntry, _ttl: Duration) -> CacheResult<()> {
		Err(CacheError::Unavailable("connection refused".to_string()))
	}

	async fn get(&self, _key: &str) -> CacheResult<Option<CacheEntry>> {
		Err(CacheError::Unavailable("connection refused".to_string()))
	}

	async fn delete(&self, _key: &str) -> CacheResult<()> {
		Err(CacheError::Unavailable("connection refused".to_string()))
	}

	async fn compare_and_set(
		&self,
		_key: &str,
		_expected: &CacheEntry,
		_replacement: CacheEntry,
	) -> CacheResult<bool> {
		Err(CacheError::Unavailable("connection refused".to_string()))
	}
}

pub struct Harness {
	pub service: SecretService,
	pub cipher: Cipher,
	pub cache: Arc<InMemoryCache>,
	pub store: Arc<FlakyStore>,
	pub sink: Arc<RecordingSink>,
	pub pool: SqlitePool,
}

pub fn test_cipher() -> Cipher {
	let params = HashParams::new(1024, 1, 1, None).unwrap();
	Cipher::with_hash_params(&CryptoConfig::default(), params).unwrap()
}

pub fn audit_service(sink: Arc<RecordingSink>) -> Arc<AuditService> {
	Arc::new(AuditService::new(
		1024,
		QueueOverflowPolicy::DropNewest,
		vec![sink],
	))
}

pub async fn harness() -> Harness {
	harness_with(SecretsConfig::default(), Duration::from_secs(5)).await
}

pub async fn harness_with(config: SecretsConfig, db_timeout: Duration) -> Harness {
	let pool = create_test_pool().await;
	let cipher = test_cipher();
	let cache = Arc::new(InMemoryCache::new(CACHE_FLOOR, 10_000));
	let store = Arc::new(FlakyStore::new(SecretRepository::with_timeout(
		pool.clone(),
		db_timeout,
	)));
	let sink = Arc::new(RecordingSink::default());

	let service = SecretService::new(
		cipher.clone(),
		cache.clone(),
		store.clone(),
		audit_service(sink.clone()),
		config,
	);

	Harness {
		service,
		cipher,
		cache,
		store,
		sink,
		pool,
	}
}

/// A service over a cache that is always down.
pub async fn uncached_harness() -> (SecretService, Arc<RecordingSink>) {
	let pool = create_test_pool().await;
	let sink = Arc::new(RecordingSink::default());
	let service = SecretService::new(
		test_cipher(),
		Arc::new(UnavailableCache),
		Arc::new(SecretRepository::new(pool)),
		audit_service(sink.clone()),
		SecretsConfig::default(),
	);
	(service, sink)
}
