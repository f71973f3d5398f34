// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wall-clock access.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tally_core::DateKey;

/// Source of the current time.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;

	/// Today's date on the local system clock.
	fn today(&self) -> DateKey {
		DateKey::local(self.now())
	}
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(now: DateTime<Utc>) -> Self {
		Self {
			now: Mutex::new(now),
		}
	}

	pub fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_manual_clock_advances() {
		let start = Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap();
		let clock = ManualClock::new(start);
		clock.advance(Duration::seconds(90));
		assert_eq!(clock.now(), start + Duration::seconds(90));

		clock.set(start);
		assert_eq!(clock.now(), start);
	}

	#[test]
	fn test_today_matches_local_date() {
		let start = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
		let clock = ManualClock::new(start);
		assert_eq!(clock.today(), DateKey::local(start));
	}
}
