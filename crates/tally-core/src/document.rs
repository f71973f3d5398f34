// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persisted analytics aggregate.
//!
//! One [`AnalyticsDocument`] is shared by every app hosted on the same origin.
//! It is never cached between operations: callers load it, mutate it and save
//! it back in one go. Decoding is lenient, see [`crate::wire`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::{AppName, DateKey, VisitorId};
use crate::wire;

/// Interaction key counting completions.
pub const COMPLETED: &str = "completed";
/// Interaction key holding the bounded score log.
pub const SCORES: &str = "scores";
/// Interaction key counting affiliate link clicks.
pub const AFFILIATE_CLICK: &str = "affiliate_click";

/// The whole persisted aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsDocument {
	#[serde(default, deserialize_with = "wire::app_map")]
	pub apps: BTreeMap<AppName, AppStats>,
	#[serde(default, deserialize_with = "wire::lenient")]
	pub global: GlobalStats,
}

impl AnalyticsDocument {
	/// Returns the stats for `app`, creating zeroed stats first seen `today`.
	///
	/// An existing entry keeps its `first_seen` unless it decoded empty.
	pub fn ensure_app(&mut self, app: &AppName, today: &DateKey) -> &mut AppStats {
		self.app_and_global(app, today).0
	}

	/// [`Self::ensure_app`], also handing out the global totals so both can be
	/// updated in one pass.
	pub fn app_and_global(
		&mut self,
		app: &AppName,
		today: &DateKey,
	) -> (&mut AppStats, &mut GlobalStats) {
		let stats = self
			.apps
			.entry(app.clone())
			.or_insert_with(|| AppStats::new(today.clone()));
		if stats.first_seen.is_empty() {
			stats.first_seen = today.clone();
		}
		(stats, &mut self.global)
	}

	pub fn app(&self, app: &AppName) -> Option<&AppStats> {
		self.apps.get(app)
	}
}

/// Origin-wide totals mirrored from every pageview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
	#[serde(default, deserialize_with = "wire::lenient")]
	pub total_views: u64,
	#[serde(default, deserialize_with = "wire::counter_map")]
	pub daily_views: BTreeMap<DateKey, u64>,
	/// Kept as a plain sequence with linear membership checks, unlike the
	/// per-app sets.
	#[serde(default, deserialize_with = "wire::visitor_list")]
	pub unique_visitors: Vec<VisitorId>,
}

impl GlobalStats {
	pub fn record_view(&mut self, visitor: &VisitorId, date: &DateKey) {
		self.total_views = self.total_views.saturating_add(1);
		bump(&mut self.daily_views, date.clone());
		self.record_visitor(visitor);
	}

	/// Appends `visitor` unless already present. Returns true when appended.
	pub fn record_visitor(&mut self, visitor: &VisitorId) -> bool {
		if self.unique_visitors.iter().any(|v| v == visitor) {
			return false;
		}
		self.unique_visitors.push(visitor.clone());
		true
	}
}

/// Per-app counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
	#[serde(default, deserialize_with = "wire::lenient")]
	pub first_seen: DateKey,
	#[serde(default, deserialize_with = "wire::lenient")]
	pub total_views: u64,
	#[serde(default, deserialize_with = "wire::visitor_set")]
	pub unique_visitors: BTreeSet<VisitorId>,
	#[serde(default, deserialize_with = "wire::counter_map")]
	pub daily_views: BTreeMap<DateKey, u64>,
	#[serde(default, deserialize_with = "wire::interaction_map")]
	pub interactions: BTreeMap<String, InteractionValue>,
	#[serde(default, deserialize_with = "wire::counter_map")]
	pub sources: BTreeMap<String, u64>,
	/// Seconds; derived from `total_time_on_page` and `total_views`
	#[serde(default, deserialize_with = "wire::lenient")]
	pub avg_time_on_page: u64,
	/// Seconds
	#[serde(default, deserialize_with = "wire::lenient")]
	pub total_time_on_page: u64,
	#[serde(default, deserialize_with = "wire::lenient")]
	pub completed_sessions: u64,
	#[serde(default, deserialize_with = "wire::lenient")]
	pub shares: u64,
	#[serde(default, deserialize_with = "wire::lenient")]
	pub affiliate_clicks: u64,
}

impl AppStats {
	#[must_use]
	pub fn new(first_seen: DateKey) -> Self {
		Self {
			first_seen,
			..Self::default()
		}
	}

	/// Counts one pageview by `visitor` on `date` arriving from `source`.
	pub fn record_view(&mut self, visitor: &VisitorId, date: &DateKey, source: &str) {
		self.total_views = self.total_views.saturating_add(1);
		self.unique_visitors.insert(visitor.clone());
		bump(&mut self.daily_views, date.clone());
		bump(&mut self.sources, source.to_string());
	}

	/// Increments the counter under `name` and returns its new value.
	///
	/// A score log stored under the same key is replaced by a fresh counter.
	pub fn increment_interaction(&mut self, name: &str) -> u64 {
		let value = self
			.interactions
			.entry(name.to_string())
			.or_insert(InteractionValue::Counter(0));
		if let InteractionValue::Counter(n) = value {
			*n = n.saturating_add(1);
			return *n;
		}
		*value = InteractionValue::Counter(1);
		1
	}

	/// Appends to the score log, keeping only the newest `cap` entries.
	pub fn push_score(&mut self, record: ScoreRecord, cap: usize) {
		let value = self
			.interactions
			.entry(SCORES.to_string())
			.or_insert_with(|| InteractionValue::ScoreLog(Vec::new()));
		if let InteractionValue::Counter(_) = value {
			*value = InteractionValue::ScoreLog(Vec::new());
		}
		if let InteractionValue::ScoreLog(log) = value {
			log.push(record);
			if log.len() > cap {
				let excess = log.len() - cap;
				log.drain(..excess);
			}
		}
	}

	/// Adds `seconds` to the accumulated time and recomputes the average.
	pub fn add_time_on_page(&mut self, seconds: u64) {
		self.total_time_on_page = self.total_time_on_page.saturating_add(seconds);
		self.avg_time_on_page = rounded_average(self.total_time_on_page, self.total_views);
	}

	pub fn counter(&self, name: &str) -> Option<u64> {
		match self.interactions.get(name) {
			Some(InteractionValue::Counter(n)) => Some(*n),
			_ => None,
		}
	}

	pub fn scores(&self) -> Option<&[ScoreRecord]> {
		match self.interactions.get(SCORES) {
			Some(InteractionValue::ScoreLog(log)) => Some(log.as_slice()),
			_ => None,
		}
	}
}

/// Value stored under an interaction name: a plain counter, or the score log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionValue {
	Counter(u64),
	ScoreLog(Vec<ScoreRecord>),
}

/// One completion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
	pub score: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max: Option<f64>,
	#[serde(default)]
	pub date: DateKey,
}

fn bump<K: Ord>(map: &mut BTreeMap<K, u64>, key: K) {
	let count = map.entry(key).or_insert(0);
	*count = count.saturating_add(1);
}

/// `round(total / max(views, 1))` with halves rounded up.
fn rounded_average(total: u64, views: u64) -> u64 {
	let views = u128::from(views.max(1));
	let total = u128::from(total);
	((2 * total + views) / (2 * views)) as u64
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn today() -> DateKey {
		"2026-01-19".parse().unwrap()
	}

	#[test]
	fn test_ensure_app_creates_zeroed_stats() {
		let mut doc = AnalyticsDocument::default();
		let stats = doc.ensure_app(&AppName::new("quiz"), &today());
		assert_eq!(stats.first_seen, today());
		assert_eq!(stats.total_views, 0);
		assert!(stats.unique_visitors.is_empty());
		assert!(stats.interactions.is_empty());
	}

	#[test]
	fn test_ensure_app_keeps_first_seen() {
		let mut doc = AnalyticsDocument::default();
		let app = AppName::new("quiz");
		doc.ensure_app(&app, &today());

		let later: DateKey = "2026-03-01".parse().unwrap();
		let stats = doc.ensure_app(&app, &later);
		assert_eq!(stats.first_seen, today());
	}

	#[test]
	fn test_ensure_app_backfills_empty_first_seen() {
		let mut doc = AnalyticsDocument::default();
		let app = AppName::new("quiz");
		doc.apps.insert(app.clone(), AppStats::default());

		assert_eq!(doc.ensure_app(&app, &today()).first_seen, today());
	}

	#[test]
	fn test_record_view_dedups_visitors() {
		let mut stats = AppStats::new(today());
		let alice = VisitorId::from_string("alice");
		let bob = VisitorId::from_string("bob");

		stats.record_view(&alice, &today(), "direct");
		stats.record_view(&alice, &today(), "direct");
		stats.record_view(&bob, &today(), "search");

		assert_eq!(stats.total_views, 3);
		assert_eq!(stats.unique_visitors.len(), 2);
		assert_eq!(stats.daily_views[&today()], 3);
		assert_eq!(stats.sources["direct"], 2);
		assert_eq!(stats.sources["search"], 1);
	}

	#[test]
	fn test_global_visitor_list_is_linear_and_ordered() {
		let mut global = GlobalStats::default();
		let ids: Vec<_> = ["c", "a", "c", "b", "a"]
			.iter()
			.map(|s| VisitorId::from_string(*s))
			.collect();
		for id in &ids {
			global.record_view(id, &today());
		}

		let kept: Vec<_> = global.unique_visitors.iter().map(|v| v.as_str()).collect();
		assert_eq!(kept, vec!["c", "a", "b"]);
		assert_eq!(global.total_views, 5);
	}

	#[test]
	fn test_increment_retypes_score_log() {
		let mut stats = AppStats::new(today());
		stats.push_score(
			ScoreRecord {
				score: 1.0,
				max: None,
				date: today(),
			},
			100,
		);
		assert_eq!(stats.increment_interaction(SCORES), 1);
		assert_eq!(stats.counter(SCORES), Some(1));
	}

	#[test]
	fn test_push_score_retypes_counter() {
		let mut stats = AppStats::new(today());
		stats
			.interactions
			.insert(SCORES.to_string(), InteractionValue::Counter(7));
		stats.push_score(
			ScoreRecord {
				score: 3.0,
				max: Some(5.0),
				date: today(),
			},
			100,
		);
		assert_eq!(stats.scores().map(|s| s.len()), Some(1));
	}

	#[test]
	fn test_score_log_keeps_newest_hundred() {
		let mut stats = AppStats::new(today());
		for i in 0..105 {
			stats.push_score(
				ScoreRecord {
					score: f64::from(i),
					max: Some(105.0),
					date: today(),
				},
				100,
			);
		}
		let scores = stats.scores().unwrap();
		assert_eq!(scores.len(), 100);
		assert_eq!(scores[0].score, 5.0);
		assert_eq!(scores[99].score, 104.0);
	}

	#[test]
	fn test_add_time_on_page_without_views() {
		let mut stats = AppStats::new(today());
		stats.add_time_on_page(42);
		assert_eq!(stats.total_time_on_page, 42);
		assert_eq!(stats.avg_time_on_page, 42);
	}

	#[test]
	fn test_average_rounds_half_up() {
		assert_eq!(rounded_average(5, 2), 3);
		assert_eq!(rounded_average(4, 3), 1);
		assert_eq!(rounded_average(5, 3), 2);
		assert_eq!(rounded_average(0, 0), 0);
	}

	#[test]
	fn test_score_record_omits_missing_max() {
		let record = ScoreRecord {
			score: 8.0,
			max: None,
			date: today(),
		};
		let value = serde_json::to_value(&record).unwrap();
		assert!(value.get("max").is_none());
	}

	proptest! {
		#[test]
		fn unique_visitors_matches_distinct_ids(ids in proptest::collection::vec("[a-e]", 0..40)) {
			let mut stats = AppStats::new(today());
			let mut global = GlobalStats::default();
			for id in &ids {
				let visitor = VisitorId::from_string(id.clone());
				stats.record_view(&visitor, &today(), "direct");
				global.record_view(&visitor, &today());
			}
			let distinct: BTreeSet<_> = ids.iter().collect();
			prop_assert_eq!(stats.unique_visitors.len(), distinct.len());
			prop_assert_eq!(global.unique_visitors.len(), distinct.len());
			prop_assert_eq!(stats.total_views, ids.len() as u64);
		}

		#[test]
		fn average_tracks_total(views in 0u64..1000, flushes in proptest::collection::vec(1u64..=3600, 1..20)) {
			let mut stats = AppStats::new(today());
			stats.total_views = views;
			for secs in flushes {
				stats.add_time_on_page(secs);
				let expected = (stats.total_time_on_page as f64 / views.max(1) as f64).round() as u64;
				prop_assert_eq!(stats.avg_time_on_page, expected);
			}
		}

		#[test]
		fn score_log_never_exceeds_cap(count in 0usize..300) {
			let mut stats = AppStats::new(today());
			for i in 0..count {
				stats.push_score(ScoreRecord { score: i as f64, max: None, date: today() }, 100);
			}
			let len = stats.scores().map_or(0, |s| s.len());
			prop_assert_eq!(len, count.min(100));
		}
	}
}
