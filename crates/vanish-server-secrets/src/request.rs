// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;
use vanish_common_secret::SecretString;

/// Input to [`SecretService::create`](crate::SecretService::create).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSecret {
	pub secret: SecretString,
	#[serde(default)]
	pub passphrase: Option<SecretString>,
	/// Seconds until the secret expires. Must be positive when given.
	#[serde(default)]
	pub ttl_seconds: Option<i64>,
}

impl CreateSecret {
	pub fn new(secret: impl Into<String>) -> Self {
		Self {
			secret: SecretString::new(secret.into()),
			passphrase: None,
			ttl_seconds: None,
		}
	}

	pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
		self.passphrase = Some(SecretString::new(passphrase.into()));
		self
	}

	pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
		self.ttl_seconds = Some(ttl_seconds);
		self
	}
}
