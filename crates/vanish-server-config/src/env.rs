// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the environment with `*_FILE` support.

use std::path::PathBuf;

use thiserror::Error;
use vanish_common_secret::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("both {name} and {name}_FILE are set; use only one")]
	Ambiguous { name: String },

	#[error("failed to read {name}_FILE at {path}: {source}")]
	FileRead {
		name: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Load a secret from `NAME`, or from the file named by `NAME_FILE`.
///
/// Empty values are treated as unset. A single trailing newline is stripped
/// from file contents so secrets mounted by orchestrators work unchanged.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let direct = std::env::var(name).ok().filter(|v| !v.is_empty());
	let file_var = format!("{name}_FILE");
	let file = std::env::var(&file_var).ok().filter(|v| !v.is_empty());

	match (direct, file) {
		(Some(_), Some(_)) => Err(SecretEnvError::Ambiguous {
			name: name.to_string(),
		}),
		(Some(value), None) => Ok(Some(SecretString::new(value))),
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let mut contents =
				std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
					name: name.to_string(),
					path: path.clone(),
					source,
				})?;
			if contents.ends_with('\n') {
				contents.pop();
				if contents.ends_with('\r') {
					contents.pop();
				}
			}
			if contents.is_empty() {
				return Ok(None);
			}
			Ok(Some(SecretString::new(contents)))
		}
		(None, None) => Ok(None),
	}
}
