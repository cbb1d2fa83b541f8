// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable store for Vanish secrets.
//!
//! SQLite via `sqlx`. The `secrets` table is the record of every secret ever
//! created; the `secret_logs` table holds the append-only audit trail written
//! by the audit crate's SQLite sink.

pub mod error;
pub mod pool;
pub mod secret;
pub mod testing;
pub mod types;

pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use secret::{SecretRepository, SecretStore};
pub use types::{MarkOutcome, NewSecret, SecretRecord};
