// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use aes_gcm::aead::OsRng;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Entropy of an issued secret key, in bytes.
pub const SECRET_KEY_BYTES: usize = 32;

/// Generate an opaque, URL-safe key with 256 bits of entropy.
pub fn generate_secret_key() -> String {
	let mut bytes = [0u8; SECRET_KEY_BYTES];
	OsRng.fill_bytes(&mut bytes);
	URL_SAFE_NO_PAD.encode(bytes)
}
