// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-time secret lifecycle engine.
//!
//! [`SecretService`] issues opaque keys for encrypted payloads that can be
//! read exactly once, optionally require a passphrase to delete, and expire
//! after a TTL.

pub mod context;
pub mod error;
pub mod request;
pub mod service;

pub use context::RequestContext;
pub use error::{Result, SecretsError};
pub use request::CreateSecret;
pub use service::SecretService;
pub use vanish_server_config::ABSOLUTE_MAX_TTL_SECS;
