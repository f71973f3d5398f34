// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event recording against the shared analytics document.
//!
//! Every operation is one synchronous load/mutate/save cycle through
//! [`AggregateStore::update`]. There is no transaction spanning operations.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::{
	AnalyticsDocument, AppName, AppStats, DateKey, GlobalStats, ScoreRecord, VisitorId,
	AFFILIATE_CLICK, COMPLETED, SCORES,
};
use tally_store::{AggregateStore, Persisted};
use tracing::debug;

use crate::clock::Clock;
use crate::config::TrackerConfig;

/// What happened to a recording request.
///
/// Callers are free to ignore it; nothing is ever surfaced to the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
	/// The updated document was written.
	Saved,
	/// The store refused the write; the previous document stands.
	Dropped,
	/// Nothing was loaded or written.
	Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The admin namespace is never recorded.
	AdminPage,
	/// Elapsed time fell outside the accepted time-on-page window.
	DurationOutOfRange,
	/// The interaction name is owned by the completion score log.
	ReservedInteraction,
}

impl From<Persisted> for RecordOutcome {
	fn from(persisted: Persisted) -> Self {
		match persisted {
			Persisted::Written => RecordOutcome::Saved,
			Persisted::Dropped => RecordOutcome::Dropped,
		}
	}
}

impl RecordOutcome {
	pub fn is_saved(&self) -> bool {
		matches!(self, RecordOutcome::Saved)
	}
}

pub struct EventRecorder {
	aggregates: AggregateStore,
	clock: Arc<dyn Clock>,
	max_scores: usize,
	time_window: RangeInclusive<u64>,
}

impl EventRecorder {
	pub fn new(aggregates: AggregateStore, clock: Arc<dyn Clock>, config: &TrackerConfig) -> Self {
		Self {
			aggregates,
			clock,
			max_scores: config.max_scores,
			time_window: config.time_on_page_window(),
		}
	}

	pub fn aggregates(&self) -> &AggregateStore {
		&self.aggregates
	}

	/// Counts a pageview in the app and mirrors it into the global totals.
	pub fn record_pageview(
		&self,
		app: &AppName,
		visitor: &VisitorId,
		date: &DateKey,
		source: &str,
	) -> RecordOutcome {
		let outcome = self.apply(app, |stats, global| {
			stats.record_view(visitor, date, source);
			global.record_view(visitor, date);
		});
		debug!(app = %app, source, ?outcome, "recorded pageview");
		outcome
	}

	/// Counts `name`. The score log key is refused so a stray interaction
	/// cannot wipe recorded scores.
	pub fn record_interaction(&self, app: &AppName, name: &str) -> RecordOutcome {
		if name == SCORES {
			debug!(app = %app, interaction = name, "refused reserved interaction");
			return RecordOutcome::Skipped(SkipReason::ReservedInteraction);
		}
		let outcome = self.apply(app, |stats, _| {
			stats.increment_interaction(name);
		});
		debug!(app = %app, interaction = name, ?outcome, "recorded interaction");
		outcome
	}

	/// `product` is logged but not aggregated per product.
	pub fn record_affiliate_click(&self, app: &AppName, product: &str) -> RecordOutcome {
		let outcome = self.apply(app, |stats, _| {
			stats.affiliate_clicks = stats.affiliate_clicks.saturating_add(1);
			stats.increment_interaction(AFFILIATE_CLICK);
		});
		debug!(app = %app, product, ?outcome, "recorded affiliate click");
		outcome
	}

	pub fn record_share(&self, app: &AppName, platform: Option<&str>) -> RecordOutcome {
		let platform = platform
			.map(str::trim)
			.filter(|p| !p.is_empty())
			.unwrap_or("unknown");
		let key = format!("share_{platform}");
		let outcome = self.apply(app, |stats, _| {
			stats.shares = stats.shares.saturating_add(1);
			stats.increment_interaction(&key);
		});
		debug!(app = %app, platform, ?outcome, "recorded share");
		outcome
	}

	/// Counts a completion and, when a score is given, appends it to the
	/// bounded score log.
	pub fn record_completion(
		&self,
		app: &AppName,
		score: Option<f64>,
		max: Option<f64>,
	) -> RecordOutcome {
		let today = self.clock.today();
		let cap = self.max_scores;
		let outcome = self.apply(app, |stats, _| {
			stats.completed_sessions = stats.completed_sessions.saturating_add(1);
			stats.increment_interaction(COMPLETED);
			if let Some(score) = score {
				stats.push_score(
					ScoreRecord {
						score,
						max,
						date: today.clone(),
					},
					cap,
				);
			}
		});
		debug!(app = %app, ?score, ?max, ?outcome, "recorded completion");
		outcome
	}

	/// Adds the time elapsed since `loaded_at`, rounded to whole seconds.
	///
	/// Durations outside the configured window are discarded without touching
	/// the store.
	pub fn record_time_on_page(&self, app: &AppName, loaded_at: DateTime<Utc>) -> RecordOutcome {
		if app.is_admin() {
			return RecordOutcome::Skipped(SkipReason::AdminPage);
		}

		let elapsed_ms = (self.clock.now() - loaded_at).num_milliseconds();
		let seconds = (elapsed_ms + 500).div_euclid(1000);
		let seconds = match u64::try_from(seconds) {
			Ok(seconds) if self.time_window.contains(&seconds) => seconds,
			_ => {
				debug!(app = %app, elapsed_ms, "discarded time on page");
				return RecordOutcome::Skipped(SkipReason::DurationOutOfRange);
			}
		};

		let outcome = self.apply(app, |stats, _| stats.add_time_on_page(seconds));
		debug!(app = %app, seconds, ?outcome, "recorded time on page");
		outcome
	}

	fn apply<F>(&self, app: &AppName, mutate: F) -> RecordOutcome
	where
		F: FnOnce(&mut AppStats, &mut GlobalStats),
	{
		if app.is_admin() {
			return RecordOutcome::Skipped(SkipReason::AdminPage);
		}
		let today = self.clock.today();
		self.aggregates
			.update(|doc: &mut AnalyticsDocument| {
				let (stats, global) = doc.app_and_global(app, &today);
				mutate(stats, global);
			})
			.into()
	}
}
