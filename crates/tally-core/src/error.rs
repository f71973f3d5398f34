// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core model.

use thiserror::Error;

/// Errors raised by the core model.
///
/// Decoding never fails (see [`crate::wire`]), so these only surface when
/// encoding a document or parsing identifiers from user input.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Invalid date key string
	#[error("invalid date key: {0}")]
	InvalidDateKey(String),

	/// Invalid referrer category string
	#[error("invalid referrer category: {0}")]
	InvalidCategory(String),

	/// Serialization error
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
