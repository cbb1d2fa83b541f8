// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cryptography for one-time secrets.
//!
//! - [`Cipher`]: AES-256-GCM payload encryption keyed from process-wide
//!   configuration, plus Argon2id passphrase digests with a configuration
//!   derived salt.
//! - [`generate_secret_key`]: the opaque, URL-safe handle issued to creators.

mod argon2_config;
pub mod cipher;
pub mod error;
pub mod keys;
pub mod passphrase;

pub use cipher::{Cipher, KEY_SIZE, NONCE_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use keys::{generate_secret_key, SECRET_KEY_BYTES};
pub use passphrase::{PassphraseHasher, SALT_SIZE};

pub use argon2::Params as HashParams;
