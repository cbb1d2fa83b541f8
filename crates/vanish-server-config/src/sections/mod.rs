// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod audit;
mod cache;
mod crypto;
mod database;
mod logging;
mod secrets;

pub use audit::{AuditConfig, AuditConfigLayer, QueueOverflowPolicy};
pub use cache::{CacheConfig, CacheConfigLayer};
pub use crypto::{CryptoConfig, CryptoConfigLayer, INSECURE_DEFAULT_SECRET_KEY};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use secrets::{SecretsConfig, SecretsConfigLayer, ABSOLUTE_MAX_TTL_SECS};
