// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Failure kinds surfaced to callers of the lifecycle engine.
///
/// `NotFound` covers never-created, already-read, deleted and expired
/// secrets alike. Store and cipher failures are logged where they are
/// reclassified and surface only as `Internal`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretsError {
	#[error("validation error: {0}")]
	Validation(String),

	#[error("secret not found")]
	NotFound,

	#[error("forbidden")]
	Forbidden,

	#[error("internal error")]
	Internal,
}

pub type Result<T> = std::result::Result<T, SecretsError>;
