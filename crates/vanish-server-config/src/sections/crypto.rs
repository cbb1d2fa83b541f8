// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encryption and passphrase hashing key material.

use serde::Deserialize;
use vanish_common_secret::SecretString;

/// Fallback key used outside production so a fresh checkout runs.
pub const INSECURE_DEFAULT_SECRET_KEY: &str = "insecure_key_change_me";

#[derive(Debug, Clone)]
pub struct CryptoConfig {
	/// Process-wide secret the payload encryption key is derived from.
	pub secret_key: SecretString,
	/// Source for the fixed passphrase salt. Falls back to `secret_key`.
	pub passphrase_salt: Option<SecretString>,
}

impl CryptoConfig {
	pub fn uses_insecure_default(&self) -> bool {
		self.secret_key.expose() == INSECURE_DEFAULT_SECRET_KEY
	}

	/// The value the passphrase salt is derived from.
	pub fn salt_source(&self) -> &SecretString {
		self.passphrase_salt.as_ref().unwrap_or(&self.secret_key)
	}
}

impl Default for CryptoConfig {
	fn default() -> Self {
		CryptoConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CryptoConfigLayer {
	#[serde(default)]
	pub secret_key: Option<SecretString>,
	#[serde(default)]
	pub passphrase_salt: Option<SecretString>,
}

impl CryptoConfigLayer {
	pub fn merge(&mut self, other: CryptoConfigLayer) {
		if other.secret_key.is_some() {
			self.secret_key = other.secret_key;
		}
		if other.passphrase_salt.is_some() {
			self.passphrase_salt = other.passphrase_salt;
		}
	}

	pub fn finalize(self) -> CryptoConfig {
		CryptoConfig {
			secret_key: self
				.secret_key
				.unwrap_or_else(|| SecretString::new(INSECURE_DEFAULT_SECRET_KEY.to_string())),
			passphrase_salt: self.passphrase_salt,
		}
	}
}
