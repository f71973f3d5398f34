// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier newtypes shared by every Tally crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Long-lived identifier for a browser profile.
///
/// Generated once and never expired. Values read back from storage are
/// accepted as-is, so anything a previous version wrote stays valid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
	/// Generates a fresh identifier (`V-` followed by a UUIDv7).
	#[must_use]
	pub fn new() -> Self {
		Self(format!("V-{}", Uuid::now_v7()))
	}

	/// Wraps an existing string without validation.
	pub fn from_string(s: impl Into<String>) -> Self {
		Self(s.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for VisitorId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for VisitorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identifier of a single idle-bounded browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	/// Generates a fresh identifier (`S-` followed by a UUIDv7).
	#[must_use]
	pub fn new() -> Self {
		Self(format!("S-{}", Uuid::now_v7()))
	}

	pub fn from_string(s: impl Into<String>) -> Self {
		Self(s.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Namespace that pageviews and interactions are attributed to.
///
/// Derived from the first path segment of the page; see
/// [`crate::classify::app_namespace`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
	/// Namespace for the site root and the home document.
	pub const HOMEPAGE: &'static str = "_homepage";
	/// Namespace of the dashboard that reads the store. Never recorded.
	pub const ADMIN: &'static str = "admin";

	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	#[must_use]
	pub fn homepage() -> Self {
		Self(Self::HOMEPAGE.to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true for the reserved dashboard namespace.
	pub fn is_admin(&self) -> bool {
		self.0 == Self::ADMIN
	}
}

impl fmt::Display for AppName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for AppName {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

/// Calendar day in sortable `YYYY-MM-DD` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
	const FORMAT: &'static str = "%Y-%m-%d";

	pub fn from_date(date: NaiveDate) -> Self {
		Self(date.format(Self::FORMAT).to_string())
	}

	/// The calendar day of `now` on the local system clock.
	pub fn local(now: DateTime<Utc>) -> Self {
		Self::from_date(now.with_timezone(&Local).date_naive())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for DateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for DateKey {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let date = NaiveDate::parse_from_str(s, Self::FORMAT)
			.map_err(|_| CoreError::InvalidDateKey(s.to_string()))?;
		Ok(Self::from_date(date))
	}
}
