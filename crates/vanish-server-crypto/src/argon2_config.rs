// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2 configuration for passphrase hashing.
//!
//! Production parameters use Argon2id with the crate defaults
//! (19 MiB, 2 iterations, parallelism 1). Unit tests in this crate use
//! minimal parameters; they MUST NOT be used in production.

use argon2::{Algorithm, Argon2, Params, Version};

/// Returns an Argon2 instance configured appropriately for the build context.
#[inline]
pub(crate) fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		// 1 MiB, 1 iteration, 1 lane.
		let params = Params::new(1024, 1, 1, None).expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

/// Argon2id with caller-supplied cost parameters.
pub(crate) fn argon2_with_params(params: Params) -> Argon2<'static> {
	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}
