// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Why a slot could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The backing file or directory could not be accessed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// The write would push the store past its byte budget. Nothing was written.
	#[error("quota exceeded: writing {requested} bytes would exceed the {quota} byte limit")]
	QuotaExceeded { requested: usize, quota: usize },

	/// The key cannot name a slot, e.g. it is empty or contains a path separator.
	#[error("invalid key: {0}")]
	InvalidKey(String),

	/// Storage is disabled or inaccessible for this context.
	#[error("store unavailable: {0}")]
	Unavailable(String),
}
