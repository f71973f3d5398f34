// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Visitor and session identity.
//!
//! The visitor id lives in the long-lived store and never expires. The
//! session lives in a tab-scoped store and is replaced once it has been idle
//! for longer than the configured timeout. Storage failures never reach the
//! caller; they degrade to an identity that only lasts for this call.

use std::sync::Arc;

use chrono::Duration;
use tally_core::{Session, VisitorId};
use tally_store::KeyValueStore;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::TrackerConfig;

pub struct IdentityProvider {
	local: Arc<dyn KeyValueStore>,
	session_store: Arc<dyn KeyValueStore>,
	clock: Arc<dyn Clock>,
	visitor_key: String,
	session_key: String,
	idle_timeout: Duration,
}

impl IdentityProvider {
	pub fn new(
		local: Arc<dyn KeyValueStore>,
		session_store: Arc<dyn KeyValueStore>,
		clock: Arc<dyn Clock>,
		config: &TrackerConfig,
	) -> Self {
		Self {
			local,
			session_store,
			clock,
			visitor_key: config.keys.visitor.clone(),
			session_key: config.keys.session.clone(),
			idle_timeout: config.session_idle_timeout(),
		}
	}

	/// Returns the persisted visitor id, generating and storing one if absent.
	pub fn visitor_id(&self) -> VisitorId {
		match self.local.get(&self.visitor_key) {
			Ok(Some(id)) if !id.trim().is_empty() => return VisitorId::from_string(id),
			Ok(_) => {}
			Err(e) => {
				// Leave the slot alone; it may hold a perfectly good id.
				warn!(error = %e, "visitor slot unreadable, using an ephemeral id");
				return VisitorId::new();
			}
		}

		let id = VisitorId::new();
		match self.local.set(&self.visitor_key, id.as_str()) {
			Ok(()) => debug!(visitor_id = %id, "generated visitor id"),
			Err(e) => warn!(visitor_id = %id, error = %e, "failed to persist visitor id"),
		}
		id
	}

	/// Returns the live session, refreshed for this access, or a new one.
	///
	/// Always writes the result back, even when the session is reused.
	pub fn session(&self) -> Session {
		let now = self.clock.now();

		let existing = match self.session_store.get(&self.session_key) {
			Ok(Some(text)) => serde_json::from_str::<Session>(&text).ok(),
			Ok(None) => None,
			Err(e) => {
				warn!(error = %e, "session slot unreadable");
				None
			}
		};

		let session = match existing {
			Some(mut session) if !session.is_expired(now, self.idle_timeout) => {
				session.touch(now);
				session
			}
			previous => {
				let session = Session::start(now);
				debug!(
					session_id = %session.id,
					replaced = previous.is_some(),
					"started session"
				);
				session
			}
		};

		match serde_json::to_string(&session) {
			Ok(text) => {
				if let Err(e) = self.session_store.set(&self.session_key, &text) {
					warn!(session_id = %session.id, error = %e, "failed to persist session");
				}
			}
			Err(e) => warn!(session_id = %session.id, error = %e, "failed to encode session"),
		}

		session
	}
}
