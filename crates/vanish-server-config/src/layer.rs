// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	AuditConfigLayer, CacheConfigLayer, CryptoConfigLayer, DatabaseConfigLayer, LoggingConfigLayer,
	SecretsConfigLayer,
};

/// Partial configuration produced by a single source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub secrets: Option<SecretsConfigLayer>,
	#[serde(default)]
	pub cache: Option<CacheConfigLayer>,
	#[serde(default)]
	pub crypto: Option<CryptoConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub audit: Option<AuditConfigLayer>,
}

fn merge_section<T: Default>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(target.get_or_insert_with(T::default), other);
	}
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.secrets, other.secrets, SecretsConfigLayer::merge);
		merge_section(&mut self.cache, other.cache, CacheConfigLayer::merge);
		merge_section(&mut self.crypto, other.crypto, CryptoConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.audit, other.audit, AuditConfigLayer::merge);
	}
}
