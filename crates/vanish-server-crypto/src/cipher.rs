// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload encryption for secret values.
//!
//! AES-256-GCM with a fresh 96-bit nonce per encryption. The stored form is
//! base64url(`nonce || ciphertext || tag`) so it fits a TEXT column and a
//! cache snapshot unchanged.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use vanish_server_config::CryptoConfig;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::passphrase::PassphraseHasher;

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
const TAG_SIZE: usize = 16;

/// Encrypts payloads and hashes passphrases with process-wide key material.
///
/// The passphrase never keys the payload encryption; it only gates deletion.
#[derive(Clone)]
pub struct Cipher {
	key: Zeroizing<[u8; KEY_SIZE]>,
	hasher: PassphraseHasher,
}

impl std::fmt::Debug for Cipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Cipher").finish_non_exhaustive()
	}
}

impl Cipher {
	/// Build a cipher from configuration with production hashing cost.
	pub fn from_config(config: &CryptoConfig) -> CryptoResult<Self> {
		Ok(Self {
			key: derive_key(config.secret_key.expose())?,
			hasher: PassphraseHasher::new(config.salt_source().expose())?,
		})
	}

	/// Build a cipher with explicit Argon2 cost parameters.
	pub fn with_hash_params(config: &CryptoConfig, params: argon2::Params) -> CryptoResult<Self> {
		Ok(Self {
			key: derive_key(config.secret_key.expose())?,
			hasher: PassphraseHasher::with_params(config.salt_source().expose(), params)?,
		})
	}

	/// Encrypt a plaintext payload.
	pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<String> {
		let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
		let cipher = Aes256Gcm::new(key);

		let nonce_bytes = generate_nonce();
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = cipher
			.encrypt(nonce, plaintext)
			.map_err(|e| CryptoError::Encryption(format!("payload encryption failed: {e}")))?;

		let mut framed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
		framed.extend_from_slice(&nonce_bytes);
		framed.extend_from_slice(&ciphertext);
		Ok(URL_SAFE_NO_PAD.encode(framed))
	}

	/// Decrypt a payload produced by [`Cipher::encrypt`].
	pub fn decrypt(&self, encoded: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
		let framed = URL_SAFE_NO_PAD
			.decode(encoded)
			.map_err(|e| CryptoError::MalformedCiphertext(format!("invalid encoding: {e}")))?;

		if framed.len() < NONCE_SIZE + TAG_SIZE {
			return Err(CryptoError::MalformedCiphertext(format!(
				"expected at least {} bytes, got {}",
				NONCE_SIZE + TAG_SIZE,
				framed.len()
			)));
		}

		let (nonce_bytes, ciphertext) = framed.split_at(NONCE_SIZE);
		let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
		let cipher = Aes256Gcm::new(key);
		let nonce = Nonce::from_slice(nonce_bytes);

		let plaintext = cipher
			.decrypt(nonce, ciphertext)
			.map_err(|e| CryptoError::Decryption(format!("payload decryption failed: {e}")))?;

		Ok(Zeroizing::new(plaintext))
	}

	/// Deterministic one-way digest of a passphrase.
	pub fn hash_passphrase(&self, passphrase: &str) -> CryptoResult<String> {
		self.hasher.hash(passphrase)
	}

	/// Recompute the digest for `passphrase` and compare it to `digest`.
	pub fn verify_passphrase(&self, passphrase: &str, digest: &str) -> bool {
		self.hasher.verify(passphrase, digest)
	}
}

fn derive_key(secret_key: &str) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
	if secret_key.is_empty() {
		return Err(CryptoError::InvalidKeyMaterial(
			"secret key must not be empty".to_string(),
		));
	}
	let digest = Sha256::digest(secret_key.as_bytes());
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	key.copy_from_slice(&digest);
	Ok(key)
}

/// Generate a random nonce.
///
/// 96-bit random nonces are safe for the expected volume of secrets under a
/// single key; the (key, nonce) pair must never repeat.
fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}
