// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{harness, harness_with, uncached_harness};
use vanish_common_secret::SecretString;
use vanish_server_cache::VolatileStore;
use vanish_server_config::SecretsConfig;
use vanish_server_db::{MarkOutcome, SecretStore};
use vanish_server_secrets::{CreateSecret, RequestContext, SecretsError};

fn ctx() -> RequestContext {
	RequestContext::new()
}

#[tokio::test]
async fn durable_mark_failure_fails_cached_read_closed() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	h.store.fail_mark_accessed.store(true, Ordering::SeqCst);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);

	// The cache entry was consumed, so the secret is burned rather than
	// delivered twice once the durable store recovers.
	h.store.fail_mark_accessed.store(false, Ordering::SeqCst);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn durable_mark_failure_is_tolerated_when_configured() {
	let h = harness_with(
		SecretsConfig {
			require_durable_read_mark: false,
			..SecretsConfig::default()
		},
		Duration::from_secs(5),
	)
	.await;
	let key = h
		.service
		.create(CreateSecret::new("best effort"), &ctx())
		.await
		.unwrap();

	h.store.fail_mark_accessed.store(true, Ordering::SeqCst);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap().expose(),
		"best effort"
	);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn durable_mark_failure_on_fallback_path_is_always_fatal() {
	let h = harness_with(
		SecretsConfig {
			require_durable_read_mark: false,
			..SecretsConfig::default()
		},
		Duration::from_secs(5),
	)
	.await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	h.store.fail_mark_accessed.store(true, Ordering::SeqCst);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);

	h.store.fail_mark_accessed.store(false, Ordering::SeqCst);
	assert_eq!(h.service.read(&key, &ctx()).await.unwrap().expose(), "x");
}

#[tokio::test]
async fn durable_lookup_failure_is_not_reported_as_missing() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	h.store.fail_find.store(true, Ordering::SeqCst);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);
	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);
}

#[tokio::test]
async fn lost_durable_race_turns_cached_read_into_not_found() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	// Another node consumed the row; this node's cache is stale.
	assert_eq!(
		h.store.mark_accessed(&key).await.unwrap(),
		MarkOutcome::Applied
	);
	assert!(h.cache.get(&key).await.unwrap().unwrap().is_readable(chrono::Utc::now()));

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn failed_durable_delete_leaves_cache_untouched() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	h.store.fail_mark_deleted.store(true, Ordering::SeqCst);
	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);
	assert!(!h.cache.get(&key).await.unwrap().unwrap().deleted);

	h.store.fail_mark_deleted.store(false, Ordering::SeqCst);
	h.service.delete(&key, None, &ctx()).await.unwrap();
	assert!(h.cache.get(&key).await.unwrap().unwrap().deleted);
}

#[tokio::test]
async fn durable_timeout_is_internal_error() {
	let h = harness_with(SecretsConfig::default(), Duration::from_millis(100)).await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	let held = h.pool.acquire().await.unwrap();
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);
	drop(held);

	assert_eq!(h.service.read(&key, &ctx()).await.unwrap().expose(), "x");
}

#[tokio::test]
async fn unavailable_cache_degrades_to_durable_store() {
	let (service, sink) = uncached_harness().await;
	let key = service
		.create(CreateSecret::new("x").with_passphrase("pw"), &ctx())
		.await
		.unwrap();

	assert_eq!(
		service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Forbidden
	);
	assert_eq!(service.read(&key, &ctx()).await.unwrap().expose(), "x");
	assert_eq!(
		service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
	service
		.delete(&key, Some(&SecretString::new("pw".to_string())), &ctx())
		.await
		.unwrap();

	assert_eq!(sink.wait_for(3).await.len(), 3);
}

#[tokio::test]
async fn internal_errors_carry_no_detail() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	h.store.fail_mark_accessed.store(true, Ordering::SeqCst);

	let err = h.service.read(&key, &ctx()).await.unwrap_err();
	assert_eq!(err.to_string(), "internal error");
}
