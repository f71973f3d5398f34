// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tally_core::{
	decode_document, encode_document, AnalyticsDocument, AppName, AppStats, DateKey,
};
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Result of writing the document back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
	Written,
	/// The write failed and was discarded; the slot keeps its previous value.
	Dropped,
}

/// Load/mutate/save access to the single analytics document slot.
///
/// Nothing is cached between calls. Every operation re-reads the slot, so
/// writes made by other tabs sharing the store are picked up, and two
/// overlapping cycles simply race: whichever saves last wins.
#[derive(Clone)]
pub struct AggregateStore {
	store: Arc<dyn KeyValueStore>,
	key: String,
}

impl AggregateStore {
	pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
		Self {
			store,
			key: key.into(),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Reads the document. Absent, unreadable and corrupt slots all yield an
	/// empty document.
	pub fn load(&self) -> AnalyticsDocument {
		let text = match self.store.get(&self.key) {
			Ok(Some(text)) => text,
			Ok(None) => {
				debug!(key = %self.key, "no analytics document yet");
				return AnalyticsDocument::default();
			}
			Err(e) => {
				warn!(key = %self.key, error = %e, "failed to read analytics document");
				return AnalyticsDocument::default();
			}
		};

		match decode_document(&text) {
			Some(doc) => {
				debug!(key = %self.key, apps = doc.apps.len(), "loaded analytics document");
				doc
			}
			None => {
				warn!(
					key = %self.key,
					bytes = text.len(),
					"analytics document is corrupt, starting from empty"
				);
				AnalyticsDocument::default()
			}
		}
	}

	/// Returns the stats for `app`, creating them if needed.
	pub fn ensure_app<'a>(
		doc: &'a mut AnalyticsDocument,
		app: &AppName,
		today: &DateKey,
	) -> &'a mut AppStats {
		doc.ensure_app(app, today)
	}

	/// Writes the document. Failures are logged and swallowed.
	pub fn save(&self, doc: &AnalyticsDocument) -> Persisted {
		let text = match encode_document(doc) {
			Ok(text) => text,
			Err(e) => {
				warn!(key = %self.key, error = %e, "failed to encode analytics document");
				return Persisted::Dropped;
			}
		};

		match self.store.set(&self.key, &text) {
			Ok(()) => {
				debug!(key = %self.key, bytes = text.len(), "saved analytics document");
				Persisted::Written
			}
			Err(e) => {
				warn!(key = %self.key, error = %e, "dropped analytics document write");
				Persisted::Dropped
			}
		}
	}

	/// Runs one full load, mutate, save cycle.
	pub fn update<F>(&self, mutate: F) -> Persisted
	where
		F: FnOnce(&mut AnalyticsDocument),
	{
		let mut doc = self.load();
		mutate(&mut doc);
		self.save(&doc)
	}
}
