// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, CacheConfigLayer, CryptoConfigLayer, DatabaseConfigLayer, LoggingConfigLayer,
	SecretsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/vanish/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: VANISH_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			environment: env_var("VANISH_SERVER_ENV"),
			database: Some(load_database_from_env()?),
			secrets: Some(load_secrets_from_env()?),
			cache: Some(load_cache_from_env()?),
			crypto: Some(load_crypto_from_env()?),
			logging: Some(load_logging_from_env()?),
			audit: Some(load_audit_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T>(name: &str, kind: &str) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
{
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_enum<T>(name: &str) -> Result<Option<T>, ConfigError>
where
	T: FromStr<Err = String>,
{
	match env_var(name) {
		Some(v) => v
			.parse()
			.map(Some)
			.map_err(|message| ConfigError::InvalidValue {
				key: name.to_string(),
				message,
			}),
		None => Ok(None),
	}
}

fn secret_env(name: &str) -> Result<Option<vanish_common_secret::SecretString>, ConfigError> {
	load_secret_env(name).map_err(|e| ConfigError::Secret(e.to_string()))
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("VANISH_SERVER_DATABASE_URL"),
		busy_timeout_ms: env_parse("VANISH_SERVER_DATABASE_BUSY_TIMEOUT_MS", "u64")?,
	})
}

fn load_secrets_from_env() -> Result<SecretsConfigLayer, ConfigError> {
	Ok(SecretsConfigLayer {
		default_ttl_secs: env_parse("VANISH_SERVER_SECRETS_DEFAULT_TTL_SECS", "u64")?,
		max_ttl_secs: env_parse("VANISH_SERVER_SECRETS_MAX_TTL_SECS", "u64")?,
		max_secret_bytes: env_parse("VANISH_SERVER_SECRETS_MAX_SECRET_BYTES", "usize")?,
		require_durable_read_mark: env_bool("VANISH_SERVER_SECRETS_REQUIRE_DURABLE_READ_MARK"),
	})
}

fn load_cache_from_env() -> Result<CacheConfigLayer, ConfigError> {
	Ok(CacheConfigLayer {
		min_ttl_secs: env_parse("VANISH_SERVER_CACHE_MIN_TTL_SECS", "u64")?,
		max_entries: env_parse("VANISH_SERVER_CACHE_MAX_ENTRIES", "usize")?,
		sweep_interval_secs: env_parse("VANISH_SERVER_CACHE_SWEEP_INTERVAL_SECS", "u64")?,
	})
}

fn load_crypto_from_env() -> Result<CryptoConfigLayer, ConfigError> {
	Ok(CryptoConfigLayer {
		secret_key: secret_env("VANISH_SERVER_SECRET_KEY")?,
		passphrase_salt: secret_env("VANISH_SERVER_PASSPHRASE_SALT")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	Ok(LoggingConfigLayer {
		level: env_var("VANISH_SERVER_LOG_LEVEL"),
		format: env_enum("VANISH_SERVER_LOG_FORMAT")?,
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	Ok(AuditConfigLayer {
		enabled: env_bool("VANISH_SERVER_AUDIT_ENABLED"),
		queue_capacity: env_parse("VANISH_SERVER_AUDIT_QUEUE_CAPACITY", "usize")?,
		queue_overflow_policy: env_enum("VANISH_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY")?,
		tracing_sink: env_bool("VANISH_SERVER_AUDIT_TRACING_SINK"),
		sqlite_sink: env_bool("VANISH_SERVER_AUDIT_SQLITE_SINK"),
	})
}
