// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::time::Duration;

use common::{harness, harness_with, CACHE_FLOOR};
use proptest::prelude::*;
use vanish_common_secret::SecretString;
use vanish_server_audit::SecretAction;
use vanish_server_cache::{CacheEntry, VolatileStore};
use vanish_server_config::SecretsConfig;
use vanish_server_db::SecretStore;
use vanish_server_secrets::{CreateSecret, RequestContext, SecretsError};

fn ctx() -> RequestContext {
	RequestContext::new()
		.with_ip_address("203.0.113.7")
		.with_user_agent("vanish-tests/1.0")
}

fn pass(p: &str) -> SecretString {
	SecretString::new(p.to_string())
}

#[tokio::test]
async fn read_returns_plaintext_once() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("hello").with_ttl_seconds(5), &ctx())
		.await
		.unwrap();

	let plaintext = h.service.read(&key, &ctx()).await.unwrap();
	assert_eq!(plaintext.expose(), "hello");

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn generated_keys_are_url_safe_and_distinct() {
	let h = harness().await;
	let a = h
		.service
		.create(CreateSecret::new("a"), &ctx())
		.await
		.unwrap();
	let b = h
		.service
		.create(CreateSecret::new("b"), &ctx())
		.await
		.unwrap();

	assert_ne!(a, b);
	assert_eq!(a.len(), 43);
	assert!(a
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[tokio::test]
async fn ciphertext_at_rest_does_not_contain_plaintext() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("correct horse battery staple"), &ctx())
		.await
		.unwrap();

	let record = h.store.find_by_key(&key).await.unwrap().unwrap();
	assert!(!record.ciphertext.contains("correct horse"));
	let cached = h.cache.get(&key).await.unwrap().unwrap();
	assert_eq!(cached.ciphertext, record.ciphertext);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
	let h = harness().await;
	assert_eq!(
		h.service.read("does-not-exist", &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
	assert_eq!(
		h.service
			.delete("does-not-exist", None, &ctx())
			.await
			.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn read_succeeds_before_expiry_and_fails_after() {
	let h = harness().await;
	let early = h
		.service
		.create(CreateSecret::new("early").with_ttl_seconds(1), &ctx())
		.await
		.unwrap();
	let late = h
		.service
		.create(CreateSecret::new("late").with_ttl_seconds(1), &ctx())
		.await
		.unwrap();

	assert_eq!(
		h.service.read(&early, &ctx()).await.unwrap().expose(),
		"early"
	);

	tokio::time::sleep(Duration::from_millis(1100)).await;

	// The cache floor keeps the entry around; its own expiry still applies.
	assert!(h.cache.get(&late).await.unwrap().is_some());
	assert_eq!(
		h.service.read(&late, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn expiry_holds_on_the_durable_path() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x").with_ttl_seconds(1), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	tokio::time::sleep(Duration::from_millis(1100)).await;

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
	let record = h.store.find_by_key(&key).await.unwrap().unwrap();
	assert!(!record.accessed);
}

#[tokio::test]
async fn cache_miss_falls_back_to_durable_store() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("fallback"), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap().expose(),
		"fallback"
	);
	assert!(h.store.find_by_key(&key).await.unwrap().unwrap().accessed);

	// The durable read leaves a consumed snapshot behind.
	let cached = h.cache.get(&key).await.unwrap().unwrap();
	assert!(cached.accessed);
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn cached_read_marks_durable_row_accessed() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	h.service.read(&key, &ctx()).await.unwrap();

	assert!(h.store.find_by_key(&key).await.unwrap().unwrap().accessed);
	assert!(h.cache.get(&key).await.unwrap().unwrap().accessed);

	// Even with the cache gone, the durable row refuses a second read.
	h.cache.delete(&key).await.unwrap();
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn passphrase_gates_delete() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x").with_passphrase("pw"), &ctx())
		.await
		.unwrap();

	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Forbidden
	);
	assert_eq!(
		h.service
			.delete(&key, Some(&pass("wrong")), &ctx())
			.await
			.unwrap_err(),
		SecretsError::Forbidden
	);

	h.service
		.delete(&key, Some(&pass("pw")), &ctx())
		.await
		.unwrap();

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
	let record = h.store.find_by_key(&key).await.unwrap().unwrap();
	assert!(record.deleted);
	assert!(!record.accessed);
}

#[tokio::test]
async fn passphrase_does_not_gate_read() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("open").with_passphrase("pw"), &ctx())
		.await
		.unwrap();

	assert_eq!(h.service.read(&key, &ctx()).await.unwrap().expose(), "open");
}

#[tokio::test]
async fn durable_passphrase_gate_applies_without_cache() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x").with_passphrase("pw"), &ctx())
		.await
		.unwrap();
	h.cache.delete(&key).await.unwrap();

	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Forbidden
	);
	assert_eq!(
		h.service
			.delete(&key, Some(&pass("nope")), &ctx())
			.await
			.unwrap_err(),
		SecretsError::Forbidden
	);
	h.service
		.delete(&key, Some(&pass("pw")), &ctx())
		.await
		.unwrap();
}

#[tokio::test]
async fn stale_cache_cannot_bypass_durable_passphrase() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x").with_passphrase("pw"), &ctx())
		.await
		.unwrap();

	// A cache entry that has lost its digest must not open the gate.
	let mut forged = h.cache.get(&key).await.unwrap().unwrap();
	forged.passphrase_digest = None;
	h.cache.set(&key, forged, CACHE_FLOOR).await.unwrap();

	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::Forbidden
	);

	// The rejected delete left neither store marked deleted.
	assert!(!h.cache.get(&key).await.unwrap().unwrap().deleted);
	assert!(!h.store.find_by_key(&key).await.unwrap().unwrap().deleted);
	assert_eq!(h.service.read(&key, &ctx()).await.unwrap().expose(), "x");
}

#[tokio::test]
async fn delete_without_passphrase_when_none_was_set() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	h.service.delete(&key, None, &ctx()).await.unwrap();

	assert!(h.cache.get(&key).await.unwrap().unwrap().deleted);
	assert!(h.store.find_by_key(&key).await.unwrap().unwrap().deleted);
}

#[tokio::test]
async fn deleting_twice_is_not_found() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	h.service.delete(&key, None, &ctx()).await.unwrap();
	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);

	h.cache.delete(&key).await.unwrap();
	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn deleted_protected_secret_does_not_reveal_passphrase() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x").with_passphrase("pw"), &ctx())
		.await
		.unwrap();
	h.service
		.delete(&key, Some(&pass("pw")), &ctx())
		.await
		.unwrap();

	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);

	h.cache.delete(&key).await.unwrap();
	assert_eq!(
		h.service.delete(&key, None, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

#[tokio::test]
async fn read_or_expired_secret_can_still_be_deleted() {
	let h = harness().await;
	let read = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	h.service.read(&read, &ctx()).await.unwrap();
	h.service.delete(&read, None, &ctx()).await.unwrap();

	let expired = h
		.service
		.create(CreateSecret::new("y").with_ttl_seconds(1), &ctx())
		.await
		.unwrap();
	tokio::time::sleep(Duration::from_millis(1100)).await;
	h.service.delete(&expired, None, &ctx()).await.unwrap();
}

#[tokio::test]
async fn audit_records_each_successful_action() {
	let h = harness().await;
	let key = h
		.service
		.create(
			CreateSecret::new("x")
				.with_passphrase("pw")
				.with_ttl_seconds(60),
			&ctx(),
		)
		.await
		.unwrap();
	h.service.read(&key, &ctx()).await.unwrap();
	let _ = h.service.delete(&key, None, &ctx()).await;
	h.service
		.delete(&key, Some(&pass("pw")), &ctx())
		.await
		.unwrap();

	let entries = h.sink.wait_for(3).await;
	tokio::time::sleep(Duration::from_millis(50)).await;
	let entries_after = h.sink.entries();
	assert_eq!(entries_after.len(), 3, "forbidden delete is not audited");

	let actions: Vec<SecretAction> = entries.iter().map(|e| e.action).collect();
	assert!(actions.contains(&SecretAction::Create));
	assert!(actions.contains(&SecretAction::Read));
	assert!(actions.contains(&SecretAction::Delete));

	for entry in &entries {
		assert_eq!(entry.secret_key, key);
		assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.7"));
		assert_eq!(entry.user_agent.as_deref(), Some("vanish-tests/1.0"));
	}

	let create = entries
		.iter()
		.find(|e| e.action == SecretAction::Create)
		.unwrap();
	assert_eq!(create.details["ttl_seconds"], 60);
	assert_eq!(create.details["with_passphrase"], true);
}

#[tokio::test]
async fn tampered_ciphertext_is_internal_error() {
	let h = harness().await;
	let key = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();

	let entry = h.cache.get(&key).await.unwrap().unwrap();
	let mut bytes = entry.ciphertext.clone().into_bytes();
	let last = bytes.len() - 1;
	bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
	let tampered = CacheEntry {
		ciphertext: String::from_utf8(bytes).unwrap(),
		..entry
	};
	h.cache.set(&key, tampered, CACHE_FLOOR).await.unwrap();

	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::Internal
	);
}

#[tokio::test]
async fn purge_scrubs_consumed_payloads() {
	let h = harness().await;
	let consumed = h
		.service
		.create(CreateSecret::new("x"), &ctx())
		.await
		.unwrap();
	let live = h
		.service
		.create(CreateSecret::new("y"), &ctx())
		.await
		.unwrap();
	h.service.read(&consumed, &ctx()).await.unwrap();

	assert_eq!(h.service.purge_expired().await.unwrap(), 1);

	let scrubbed = h.store.find_by_key(&consumed).await.unwrap().unwrap();
	assert!(scrubbed.ciphertext.is_empty());
	assert_eq!(h.service.read(&live, &ctx()).await.unwrap().expose(), "y");
}

#[tokio::test]
async fn configured_default_ttl_is_used() {
	let h = harness_with(
		SecretsConfig {
			default_ttl_secs: 1,
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

	tokio::time::sleep(Duration::from_millis(1100)).await;
	assert_eq!(
		h.service.read(&key, &ctx()).await.unwrap_err(),
		SecretsError::NotFound
	);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(16))]

	#[test]
	fn round_trip_is_byte_identical(secret in "\\PC{1,256}") {
		let rt = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.unwrap();
		rt.block_on(async {
			let h = harness().await;
			let key = h
				.service
				.create(CreateSecret::new(secret.clone()), &ctx())
				.await
				.unwrap();
			let plaintext = h.service.read(&key, &ctx()).await.unwrap();
			assert_eq!(plaintext.expose().as_bytes(), secret.as_bytes());
		});
	}
}
