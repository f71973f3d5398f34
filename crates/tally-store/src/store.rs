// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use crate::error::StoreError;

/// A string-only key/value slot store.
///
/// Implementations may be shared with other processes or tabs, so a value
/// read now can be overwritten by someone else before the next write. Calls
/// are synchronous and never suspend.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
