// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Create, read and delete across the volatile cache and the durable store.
//!
//! The cache is consulted first and is trusted for its own "already gone"
//! signal, never for existence. The durable store is the fallback of record
//! and the authority for the passphrase gate. At-most-once delivery rests on
//! the cache's compare-and-set plus the durable conditional update; this
//! service holds no locks of its own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use vanish_common_secret::{key_prefix, SecretString};
use vanish_server_audit::{AuditLogBuilder, AuditLogEntry, AuditService, SecretAction};
use vanish_server_cache::{CacheEntry, VolatileStore};
use vanish_server_config::{SecretsConfig, ABSOLUTE_MAX_TTL_SECS};
use vanish_server_crypto::{generate_secret_key, Cipher};
use vanish_server_db::{DbError, MarkOutcome, NewSecret, SecretRecord, SecretStore};

use crate::context::RequestContext;
use crate::error::{Result, SecretsError};
use crate::request::CreateSecret;

/// Regenerations allowed when a fresh key collides with an existing row.
const INSERT_ATTEMPTS: usize = 3;

/// Retries for flipping `deleted` on a cache entry that keeps changing.
const CACHE_FLIP_ATTEMPTS: usize = 8;

enum CacheRead {
	Served(SecretString),
	/// The cache could not be used; fall through to the durable store.
	Bypass,
}

#[derive(Clone)]
pub struct SecretService {
	cipher: Cipher,
	cache: Arc<dyn VolatileStore>,
	store: Arc<dyn SecretStore>,
	audit: Arc<AuditService>,
	config: Arc<SecretsConfig>,
}

impl SecretService {
	pub fn new(
		cipher: Cipher,
		cache: Arc<dyn VolatileStore>,
		store: Arc<dyn SecretStore>,
		audit: Arc<AuditService>,
		config: SecretsConfig,
	) -> Self {
		Self {
			cipher,
			cache,
			store,
			audit,
			config: Arc::new(config),
		}
	}

	/// Encrypt and persist a new secret, returning its key.
	///
	/// # Errors
	/// `Validation` for an empty or oversized secret, an empty passphrase, or
	/// a TTL that is not positive or exceeds the configured maximum.
	#[instrument(
		skip_all,
		fields(
			ttl_seconds = request.ttl_seconds,
			with_passphrase = request.passphrase.is_some()
		)
	)]
	pub async fn create(&self, request: CreateSecret, ctx: &RequestContext) -> Result<String> {
		let ttl_seconds = self.validate_create(&request)?;
		let expires_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);

		let ciphertext = self
			.cipher
			.encrypt(request.secret.expose().as_bytes())
			.map_err(|e| {
				error!(error = %e, "failed to encrypt secret");
				SecretsError::Internal
			})?;

		let passphrase_digest = match request.passphrase {
			Some(passphrase) => Some(self.hash_passphrase(passphrase).await?),
			None => None,
		};
		let with_passphrase = passphrase_digest.is_some();

		let record = self
			.insert_with_fresh_key(ciphertext, passphrase_digest, expires_at)
			.await?;
		let key = record.secret_key;

		let entry = CacheEntry::new(record.ciphertext, record.passphrase_digest, record.expires_at);
		if let Err(e) = self
			.cache
			.set(&key, entry, Duration::from_secs(ttl_seconds))
			.await
		{
			warn!(key = %key_prefix(&key), error = %e, "failed to populate cache");
		}

		self.record(
			ctx,
			AuditLogEntry::builder(SecretAction::Create, &key).details(json!({
				"ttl_seconds": ttl_seconds,
				"with_passphrase": with_passphrase,
			})),
		);

		info!(key = %key_prefix(&key), "secret created");
		Ok(key)
	}

	/// Return the plaintext of an unread, undeleted, unexpired secret and
	/// consume it.
	///
	/// # Errors
	/// `NotFound` if the secret never existed, was already read or deleted,
	/// has expired, or a concurrent reader won. `Internal` on cipher or
	/// durable store failure.
	#[instrument(skip_all, fields(key = %key_prefix(key)))]
	pub async fn read(&self, key: &str, ctx: &RequestContext) -> Result<SecretString> {
		let now = Utc::now();

		let cached = match self.cache.get(key).await {
			Ok(cached) => cached,
			Err(e) => {
				warn!(error = %e, "cache unavailable, falling back to durable store");
				None
			}
		};

		let plaintext = match cached {
			Some(entry) => match self.read_through_cache(key, entry, now).await? {
				CacheRead::Served(plaintext) => plaintext,
				CacheRead::Bypass => self.read_from_store(key, now).await?,
			},
			None => self.read_from_store(key, now).await?,
		};

		self.record(ctx, AuditLogEntry::builder(SecretAction::Read, key));

		info!("secret read");
		Ok(plaintext)
	}

	/// Soft-delete a secret, enforcing its passphrase if it has one.
	///
	/// # Errors
	/// `Forbidden` if a passphrase is required and missing or wrong.
	/// `NotFound` if the secret never existed or is already deleted.
	#[instrument(skip_all, fields(key = %key_prefix(key), with_passphrase = passphrase.is_some()))]
	pub async fn delete(
		&self,
		key: &str,
		passphrase: Option<&SecretString>,
		ctx: &RequestContext,
	) -> Result<()> {
		let cached = match self.cache.get(key).await {
			Ok(cached) => cached,
			Err(e) => {
				warn!(error = %e, "cache unavailable, checking durable store only");
				None
			}
		};

		let mut verified_digest = None;
		if let Some(entry) = &cached {
			if entry.deleted {
				return Err(SecretsError::NotFound);
			}
			if let Some(digest) = &entry.passphrase_digest {
				if !self.passphrase_matches(passphrase, digest).await? {
					debug!("cached passphrase gate rejected delete");
					return Err(SecretsError::Forbidden);
				}
				verified_digest = Some(digest.clone());
			}
		}

		let outcome = self
			.delete_durable(key, passphrase, verified_digest.as_deref())
			.await;

		if matches!(outcome, Ok(()) | Err(SecretsError::NotFound)) {
			self.flip_cached_deleted(key).await;
		}
		outcome?;

		self.record(ctx, AuditLogEntry::builder(SecretAction::Delete, key));

		info!("secret deleted");
		Ok(())
	}

	/// Scrub the payload of every durable row that can no longer be read.
	///
	/// # Returns
	/// The number of rows scrubbed.
	#[instrument(skip_all)]
	pub async fn purge_expired(&self) -> Result<u64> {
		self
			.store
			.purge_expired_before(Utc::now())
			.await
			.map_err(|e| {
				error!(error = %e, "failed to purge expired secrets");
				SecretsError::Internal
			})
	}

	fn validate_create(&self, request: &CreateSecret) -> Result<u64> {
		let secret = request.secret.expose();
		if secret.is_empty() {
			return Err(SecretsError::Validation(
				"secret must not be empty".to_string(),
			));
		}
		if secret.len() > self.config.max_secret_bytes {
			return Err(SecretsError::Validation(format!(
				"secret must not exceed {} bytes",
				self.config.max_secret_bytes
			)));
		}

		if let Some(passphrase) = &request.passphrase {
			if passphrase.expose().is_empty() {
				return Err(SecretsError::Validation(
					"passphrase must not be empty".to_string(),
				));
			}
		}

		let ttl_seconds = match request.ttl_seconds {
			None => self.config.default_ttl_secs,
			Some(ttl) if ttl <= 0 => {
				return Err(SecretsError::Validation(
					"ttl_seconds must be positive".to_string(),
				));
			}
			Some(ttl) => ttl as u64,
		};

		let max = self
			.config
			.max_ttl_secs
			.unwrap_or(ABSOLUTE_MAX_TTL_SECS)
			.min(ABSOLUTE_MAX_TTL_SECS);
		if ttl_seconds > max {
			return Err(SecretsError::Validation(format!(
				"ttl_seconds must not exceed {max}"
			)));
		}

		Ok(ttl_seconds)
	}

	async fn insert_with_fresh_key(
		&self,
		ciphertext: String,
		passphrase_digest: Option<String>,
		expires_at: DateTime<Utc>,
	) -> Result<SecretRecord> {
		for attempt in 1..=INSERT_ATTEMPTS {
			let secret = NewSecret {
				secret_key: generate_secret_key(),
				ciphertext: ciphertext.clone(),
				passphrase_digest: passphrase_digest.clone(),
				expires_at,
			};

			match self.store.insert(&secret).await {
				Ok(record) => return Ok(record),
				Err(DbError::Conflict(_)) => {
					warn!(attempt, "generated key collided with an existing secret");
				}
				Err(e) => {
					error!(error = %e, "failed to persist secret");
					return Err(SecretsError::Internal);
				}
			}
		}

		error!(attempts = INSERT_ATTEMPTS, "could not generate an unused key");
		Err(SecretsError::Internal)
	}

	async fn read_through_cache(
		&self,
		key: &str,
		entry: CacheEntry,
		now: DateTime<Utc>,
	) -> Result<CacheRead> {
		if !entry.is_readable(now) {
			return Err(SecretsError::NotFound);
		}

		let plaintext = self.decrypt(&entry.ciphertext)?;

		match self
			.cache
			.compare_and_set(key, &entry, entry.with_accessed())
			.await
		{
			Ok(true) => {}
			Ok(false) => {
				debug!("lost cache race for read");
				return Err(SecretsError::NotFound);
			}
			Err(e) => {
				warn!(error = %e, "cache compare-and-set failed, falling back to durable store");
				return Ok(CacheRead::Bypass);
			}
		}

		match self.store.mark_accessed(key).await {
			Ok(MarkOutcome::Applied) => {}
			Ok(outcome) => {
				warn!(?outcome, "durable record already consumed, refusing cached read");
				return Err(SecretsError::NotFound);
			}
			Err(e) if self.config.require_durable_read_mark => {
				error!(error = %e, "failed to mark secret accessed");
				return Err(SecretsError::Internal);
			}
			Err(e) => {
				warn!(error = %e, "failed to mark secret accessed, serving cached read");
			}
		}

		Ok(CacheRead::Served(plaintext))
	}

	async fn read_from_store(&self, key: &str, now: DateTime<Utc>) -> Result<SecretString> {
		let record = self.find_record(key).await?.ok_or(SecretsError::NotFound)?;
		if !record.is_readable(now) {
			return Err(SecretsError::NotFound);
		}

		let plaintext = self.decrypt(&record.ciphertext)?;

		match self.store.mark_accessed(key).await {
			Ok(MarkOutcome::Applied) => {}
			Ok(outcome) => {
				debug!(?outcome, "lost durable race for read");
				return Err(SecretsError::NotFound);
			}
			Err(e) => {
				error!(error = %e, "failed to mark secret accessed");
				return Err(SecretsError::Internal);
			}
		}

		let consumed = CacheEntry {
			accessed: true,
			..CacheEntry::new(record.ciphertext, record.passphrase_digest, record.expires_at)
		};
		let remaining = (record.expires_at - now).to_std().unwrap_or(Duration::ZERO);
		if let Err(e) = self.cache.set(key, consumed, remaining).await {
			warn!(error = %e, "failed to cache consumed secret");
		}

		Ok(plaintext)
	}

	async fn delete_durable(
		&self,
		key: &str,
		passphrase: Option<&SecretString>,
		verified_digest: Option<&str>,
	) -> Result<()> {
		let record = self.find_record(key).await?.ok_or(SecretsError::NotFound)?;
		if record.deleted {
			return Err(SecretsError::NotFound);
		}

		if let Some(digest) = &record.passphrase_digest {
			let verified = verified_digest == Some(digest.as_str())
				|| self.passphrase_matches(passphrase, digest).await?;
			if !verified {
				debug!("durable passphrase gate rejected delete");
				return Err(SecretsError::Forbidden);
			}
		}

		match self.store.mark_deleted(key).await {
			Ok(MarkOutcome::Applied) => Ok(()),
			Ok(outcome) => {
				debug!(?outcome, "secret deleted concurrently");
				Err(SecretsError::NotFound)
			}
			Err(e) => {
				error!(error = %e, "failed to mark secret deleted");
				Err(SecretsError::Internal)
			}
		}
	}

	/// Set `deleted` on the cached entry, if any, keeping its deadline.
	async fn flip_cached_deleted(&self, key: &str) {
		for _ in 0..CACHE_FLIP_ATTEMPTS {
			let current = match self.cache.get(key).await {
				Ok(Some(entry)) => entry,
				Ok(None) => return,
				Err(e) => {
					warn!(error = %e, "failed to load cached entry for delete");
					return;
				}
			};
			if current.deleted {
				return;
			}

			match self
				.cache
				.compare_and_set(key, &current, current.with_deleted())
				.await
			{
				Ok(true) => return,
				Ok(false) => continue,
				Err(e) => {
					warn!(error = %e, "failed to mark cached entry deleted");
					return;
				}
			}
		}

		warn!(
			attempts = CACHE_FLIP_ATTEMPTS,
			"cached entry kept changing, leaving delete to the durable store"
		);
	}

	async fn find_record(&self, key: &str) -> Result<Option<SecretRecord>> {
		self.store.find_by_key(key).await.map_err(|e| {
			error!(error = %e, "failed to load secret");
			SecretsError::Internal
		})
	}

	fn decrypt(&self, ciphertext: &str) -> Result<SecretString> {
		let bytes = self.cipher.decrypt(ciphertext).map_err(|e| {
			error!(error = %e, "failed to decrypt secret");
			SecretsError::Internal
		})?;
		let text = std::str::from_utf8(&bytes).map_err(|_| {
			error!("decrypted secret is not valid UTF-8");
			SecretsError::Internal
		})?;
		Ok(SecretString::new(text.to_string()))
	}

	async fn hash_passphrase(&self, passphrase: SecretString) -> Result<String> {
		let cipher = self.cipher.clone();
		tokio::task::spawn_blocking(move || cipher.hash_passphrase(passphrase.expose()))
			.await
			.map_err(|e| {
				error!(error = %e, "passphrase hashing task failed");
				SecretsError::Internal
			})?
			.map_err(|e| {
				error!(error = %e, "failed to hash passphrase");
				SecretsError::Internal
			})
	}

	/// A missing passphrase never matches.
	async fn passphrase_matches(
		&self,
		supplied: Option<&SecretString>,
		digest: &str,
	) -> Result<bool> {
		let Some(supplied) = supplied.cloned() else {
			return Ok(false);
		};
		let cipher = self.cipher.clone();
		let digest = digest.to_string();

		tokio::task::spawn_blocking(move || cipher.verify_passphrase(supplied.expose(), &digest))
			.await
			.map_err(|e| {
				error!(error = %e, "passphrase verification task failed");
				SecretsError::Internal
			})
	}

	fn record(&self, ctx: &RequestContext, builder: AuditLogBuilder) {
		self.audit.log(ctx.apply(builder).build());
	}
}
