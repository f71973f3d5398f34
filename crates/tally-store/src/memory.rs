// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// In-process store, used for tab-scoped slots and in tests.
///
/// With a quota, a write that would push the total size of keys and values
/// past the limit fails with [`StoreError::QuotaExceeded`] and leaves the
/// previous value in place, like a browser's local storage does.
#[derive(Debug, Default)]
pub struct MemoryStore {
	slots: Mutex<HashMap<String, String>>,
	quota: Option<usize>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store that holds at most `bytes` of keys and values.
	pub fn with_quota(bytes: usize) -> Self {
		Self {
			slots: Mutex::new(HashMap::new()),
			quota: Some(bytes),
		}
	}

	fn slots(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
		self
			.slots
			.lock()
			.map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.slots()?.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut slots = self.slots()?;

		if let Some(quota) = self.quota {
			let others: usize = slots
				.iter()
				.filter(|(k, _)| k.as_str() != key)
				.map(|(k, v)| k.len() + v.len())
				.sum();
			let requested = others + key.len() + value.len();
			if requested > quota {
				return Err(StoreError::QuotaExceeded { requested, quota });
			}
		}

		slots.insert(key.to_string(), value.to_string());
		Ok(())
	}
}
