// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("decryption failed: {0}")]
	Decryption(String),

	#[error("malformed ciphertext: {0}")]
	MalformedCiphertext(String),

	#[error("passphrase hashing failed: {0}")]
	Hashing(String),

	#[error("invalid key material: {0}")]
	InvalidKeyMaterial(String),
}
