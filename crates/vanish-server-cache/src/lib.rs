// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Volatile store for secret lifecycle snapshots.
//!
//! The cache is the fast path for "already gone" decisions and never the sole
//! witness that a secret exists. [`VolatileStore`] is the seam; the
//! in-process [`InMemoryCache`] is the default backend.

pub mod entry;
pub mod error;
pub mod memory;
pub mod store;

pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult};
pub use memory::{InMemoryCache, MIN_SWEEP_INTERVAL};
pub use store::{effective_ttl, VolatileStore};
