// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session record for idle-bounded browsing periods.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// A single engagement period of one tab.
///
/// A session is never deleted. It is superseded by a fresh one once the gap
/// since `last_activity` exceeds the idle timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub id: SessionId,

	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub start: DateTime<Utc>,

	/// Never moves backwards while the session lives
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub last_activity: DateTime<Utc>,

	/// Accesses seen by this session, including the one that created it
	pub pageviews: u32,
}

impl Session {
	/// Creates a session whose first access happens at `now`.
	#[must_use]
	pub fn start(now: DateTime<Utc>) -> Self {
		Self {
			id: SessionId::new(),
			start: now,
			last_activity: now,
			pageviews: 1,
		}
	}

	/// True once the idle gap is strictly greater than `idle_timeout`.
	#[must_use]
	pub fn is_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
		now - self.last_activity > idle_timeout
	}

	/// Records another access at `now`.
	pub fn touch(&mut self, now: DateTime<Utc>) {
		self.last_activity = self.last_activity.max(now);
		self.pageviews = self.pageviews.saturating_add(1);
	}
}
