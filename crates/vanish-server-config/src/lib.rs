// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Vanish secret service.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`VANISH_SERVER_*`)
//! - `*_FILE` indirection for key material
//!
//! # Usage
//!
//! ```ignore
//! use vanish_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("default ttl: {}s", config.secrets.default_ttl_secs);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info, warn};

const PRODUCTION: &str = "production";

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub environment: String,
	pub database: DatabaseConfig,
	pub secrets: SecretsConfig,
	pub cache: CacheConfig,
	pub crypto: CryptoConfig,
	pub logging: LoggingConfig,
	pub audit: AuditConfig,
}

impl ServerConfig {
	pub fn is_production(&self) -> bool {
		self.environment == PRODUCTION
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`VANISH_SERVER_*`)
/// 2. Config file (`/etc/vanish/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		environment: layer
			.environment
			.unwrap_or_else(|| "development".to_string()),
		database: layer.database.unwrap_or_default().finalize(),
		secrets: layer.secrets.unwrap_or_default().finalize(),
		cache: layer.cache.unwrap_or_default().finalize(),
		crypto: layer.crypto.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		audit: layer.audit.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	if config.crypto.uses_insecure_default() {
		warn!("VANISH_SERVER_SECRET_KEY is not set; using the insecure development key");
	}

	info!(
		environment = %config.environment,
		database = %config.database.url,
		default_ttl_secs = config.secrets.default_ttl_secs,
		cache_min_ttl_secs = config.cache.min_ttl.as_secs(),
		audit_enabled = config.audit.enabled,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.is_production() && config.crypto.uses_insecure_default() {
		return Err(ConfigError::Validation(
			"VANISH_SERVER_SECRET_KEY must be set when VANISH_SERVER_ENV=production".to_string(),
		));
	}

	if config.secrets.default_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"secrets.default_ttl_secs must be greater than zero".to_string(),
		));
	}

	if config.secrets.default_ttl_secs > ABSOLUTE_MAX_TTL_SECS {
		return Err(ConfigError::Validation(format!(
			"secrets.default_ttl_secs must not exceed {ABSOLUTE_MAX_TTL_SECS}"
		)));
	}

	if let Some(max) = config.secrets.max_ttl_secs {
		if max < config.secrets.default_ttl_secs {
			return Err(ConfigError::Validation(format!(
				"secrets.max_ttl_secs ({max}) is below secrets.default_ttl_secs ({})",
				config.secrets.default_ttl_secs
			)));
		}
	}

	if config.cache.sweep_interval.is_zero() {
		return Err(ConfigError::Validation(
			"cache.sweep_interval_secs must be greater than zero".to_string(),
		));
	}

	if config.audit.queue_capacity == 0 {
		return Err(ConfigError::Validation(
			"audit.queue_capacity must be greater than zero".to_string(),
		));
	}

	Ok(())
}
