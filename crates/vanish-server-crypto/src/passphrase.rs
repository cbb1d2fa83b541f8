// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Passphrase digests.
//!
//! Digests are Argon2id PHC strings computed with a fixed salt derived from
//! configuration, so hashing is deterministic for a given deployment. This is
//! weaker than a per-secret random salt. Verification reads the salt and cost
//! from the stored PHC string, so digests written with a different salt
//! scheme still verify.

use argon2::{
	password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2, Params,
};
use sha2::{Digest, Sha256};

use crate::argon2_config::{argon2_instance, argon2_with_params};
use crate::error::{CryptoError, CryptoResult};

/// Salt length in bytes.
pub const SALT_SIZE: usize = 16;

const SALT_CONTEXT: &[u8] = b"vanish-passphrase-salt";

#[derive(Clone)]
pub struct PassphraseHasher {
	argon2: Argon2<'static>,
	salt: SaltString,
}

impl PassphraseHasher {
	pub fn new(salt_source: &str) -> CryptoResult<Self> {
		Ok(Self {
			argon2: argon2_instance(),
			salt: derive_salt(salt_source)?,
		})
	}

	pub fn with_params(salt_source: &str, params: Params) -> CryptoResult<Self> {
		Ok(Self {
			argon2: argon2_with_params(params),
			salt: derive_salt(salt_source)?,
		})
	}

	pub fn hash(&self, passphrase: &str) -> CryptoResult<String> {
		self
			.argon2
			.hash_password(passphrase.as_bytes(), &self.salt)
			.map(|hash| hash.to_string())
			.map_err(|e| CryptoError::Hashing(e.to_string()))
	}

	/// Returns `false` for a mismatch and for a digest that cannot be parsed.
	pub fn verify(&self, passphrase: &str, digest: &str) -> bool {
		let parsed = match PasswordHash::new(digest) {
			Ok(parsed) => parsed,
			Err(e) => {
				tracing::warn!(error = %e, "stored passphrase digest is not a valid PHC string");
				return false;
			}
		};

		self
			.argon2
			.verify_password(passphrase.as_bytes(), &parsed)
			.is_ok()
	}
}

fn derive_salt(source: &str) -> CryptoResult<SaltString> {
	let mut hasher = Sha256::new();
	hasher.update(SALT_CONTEXT);
	hasher.update(source.as_bytes());
	let digest = hasher.finalize();

	SaltString::encode_b64(&digest[..SALT_SIZE])
		.map_err(|e| CryptoError::InvalidKeyMaterial(format!("cannot encode salt: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_and_verify() {
		let hasher = PassphraseHasher::new("salt-source").unwrap();

		let digest = hasher.hash("correct horse").unwrap();
		assert!(digest.starts_with("$argon2id"));

		assert!(hasher.verify("correct horse", &digest));
		assert!(!hasher.verify("wrong", &digest));
	}

	#[test]
	fn test_hash_is_deterministic_per_salt_source() {
		let a = PassphraseHasher::new("source-a").unwrap();
		let b = PassphraseHasher::new("source-b").unwrap();

		assert_eq!(a.hash("pw").unwrap(), a.hash("pw").unwrap());
		assert_ne!(a.hash("pw").unwrap(), b.hash("pw").unwrap());
	}

	#[test]
	fn test_verify_uses_salt_from_digest() {
		let a = PassphraseHasher::new("source-a").unwrap();
		let b = PassphraseHasher::new("source-b").unwrap();

		let digest = a.hash("pw").unwrap();
		assert!(b.verify("pw", &digest));
	}

	#[test]
	fn test_malformed_digest_does_not_verify() {
		let hasher = PassphraseHasher::new("salt-source").unwrap();
		assert!(!hasher.verify("pw", "not-a-phc-string"));
		assert!(!hasher.verify("pw", ""));
	}

	#[test]
	fn test_empty_passphrase_hashes() {
		let hasher = PassphraseHasher::new("salt-source").unwrap();
		let digest = hasher.hash("").unwrap();
		assert!(hasher.verify("", &digest));
		assert!(!hasher.verify(" ", &digest));
	}
}
