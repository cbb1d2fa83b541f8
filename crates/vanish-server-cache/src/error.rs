// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("cache unavailable: {0}")]
	Unavailable(String),

	#[error("ttl out of range: {0:?}")]
	InvalidTtl(Duration),
}
