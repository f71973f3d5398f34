// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use tempfile::Builder;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Directory-backed store with one file per key.
///
/// Each write goes to its own hidden temporary file in the same directory and
/// is renamed into place, so a reader sees either the old or the new value,
/// never a torn one. There is no locking: concurrent writers race and the
/// last rename wins.
#[derive(Debug, Clone)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	pub fn new(dir: PathBuf) -> Self {
		Self { dir }
	}

	/// Opens the store under `$XDG_DATA_HOME/tally`.
	pub fn from_xdg() -> Result<Self, StoreError> {
		let data_dir = dirs::data_dir().ok_or_else(|| {
			StoreError::Io(std::io::Error::new(
				ErrorKind::NotFound,
				"could not determine XDG data directory",
			))
		})?;

		let dir = data_dir.join("tally");
		std::fs::create_dir_all(&dir)?;

		info!(dir = %dir.display(), "initialized file store");

		Ok(Self::new(dir))
	}

	pub fn dir(&self) -> &PathBuf {
		&self.dir
	}

	fn slot_path(&self, key: &str) -> Result<PathBuf, StoreError> {
		let valid = !key.is_empty()
			&& !key.starts_with('.')
			&& key
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
		if !valid {
			return Err(StoreError::InvalidKey(key.to_string()));
		}
		Ok(self.dir.join(key))
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let path = self.slot_path(key)?;

		match std::fs::read_to_string(&path) {
			Ok(contents) => {
				debug!(key, bytes = contents.len(), "read slot");
				Ok(Some(contents))
			}
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!(key, path = %path.display(), "slot file not found");
				Ok(None)
			}
			Err(e) => Err(e.into()),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let path = self.slot_path(key)?;
		std::fs::create_dir_all(&self.dir)?;

		// Keys never start with a dot, so temporaries cannot shadow a slot.
		let mut tmp = Builder::new()
			.prefix(&format!(".{key}."))
			.suffix(".tmp")
			.tempfile_in(&self.dir)?;
		tmp.write_all(value.as_bytes())?;
		tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

		debug!(key, bytes = value.len(), path = %path.display(), "wrote slot");

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;
	use std::thread;
	use tempfile::TempDir;

	fn create_test_store() -> (FileStore, TempDir) {
		let tmp = TempDir::new().unwrap();
		let store = FileStore::new(tmp.path().join("slots"));
		(store, tmp)
	}

	#[test]
	fn test_missing_slot_is_none() {
		let (store, _tmp) = create_test_store();
		assert_eq!(store.get("tally_analytics").unwrap(), None);
	}

	#[test]
	fn test_set_then_get() {
		let (store, _tmp) = create_test_store();
		store.set("tally_analytics", "{\"apps\":{}}").unwrap();
		assert_eq!(
			store.get("tally_analytics").unwrap().as_deref(),
			Some("{\"apps\":{}}")
		);
	}

	fn entries(store: &FileStore) -> Vec<String> {
		let mut names: Vec<String> = std::fs::read_dir(store.dir())
			.unwrap()
			.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
			.collect();
		names.sort();
		names
	}

	#[test]
	fn test_overwrite_leaves_no_tmp_file() {
		let (store, _tmp) = create_test_store();
		store.set("k", "one").unwrap();
		store.set("k", "two").unwrap();

		assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
		assert_eq!(entries(&store), vec!["k"]);
	}

	#[test]
	fn test_rejects_path_like_keys() {
		let (store, _tmp) = create_test_store();
		for key in ["", "../escape", "a/b", ".hidden"] {
			assert!(
				matches!(store.set(key, "v"), Err(StoreError::InvalidKey(_))),
				"{key}"
			);
		}
	}

	#[test]
	fn test_two_handles_share_a_directory() {
		let (store, _tmp) = create_test_store();
		let other = FileStore::new(store.dir().clone());

		store.set("k", "from first").unwrap();
		assert_eq!(other.get("k").unwrap().as_deref(), Some("from first"));
	}

	#[test]
	fn test_concurrent_writers_never_drop_or_tear() {
		let (store, _tmp) = create_test_store();
		store.set("doc", &"a".repeat(64 * 1024)).unwrap();

		let stop = Arc::new(AtomicBool::new(false));
		let writers: Vec<_> = ['a', 'b']
			.into_iter()
			.map(|fill| {
				let handle = FileStore::new(store.dir().clone());
				thread::spawn(move || {
					let value = fill.to_string().repeat(64 * 1024);
					for _ in 0..100 {
						handle.set("doc", &value).unwrap();
					}
				})
			})
			.collect();

		let reader = {
			let handle = FileStore::new(store.dir().clone());
			let stop = stop.clone();
			thread::spawn(move || {
				let mut torn = 0;
				while !stop.load(Ordering::Relaxed) {
					let value = handle.get("doc").unwrap().unwrap();
					let uniform = value.len() == 64 * 1024
						&& (value.bytes().all(|b| b == b'a') || value.bytes().all(|b| b == b'b'));
					if !uniform {
						torn += 1;
					}
				}
				torn
			})
		};

		for writer in writers {
			writer.join().unwrap();
		}
		stop.store(true, Ordering::Relaxed);
		assert_eq!(reader.join().unwrap(), 0);
		assert_eq!(entries(&store), vec!["doc"]);
	}
}
