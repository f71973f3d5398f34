// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-page tracking handle.
//!
//! [`Tracker::start`] classifies the navigation, resolves identity and records
//! the pageview. The returned handle is what host pages call into afterwards.
//! On the admin namespace the handle is inert: nothing is read or written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::{
	app_namespace, source_key, AppName, DateKey, ReferrerCategory, Session, UtmParams, VisitorId,
};
use tally_store::{AggregateStore, KeyValueStore, MemoryStore};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::identity::IdentityProvider;
use crate::recorder::{EventRecorder, RecordOutcome, SkipReason};

/// Read-only navigation inputs supplied by the hosting page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationContext {
	pub path: String,
	pub query: String,
	pub referrer: String,
	/// Host serving the page. Counted as an own domain.
	pub host: String,
}

impl NavigationContext {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = query.into();
		self
	}

	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = referrer.into();
		self
	}

	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();
		self
	}
}

/// The long-lived and tab-scoped stores a tracker persists into.
#[derive(Clone)]
pub struct Stores {
	pub local: Arc<dyn KeyValueStore>,
	pub session: Arc<dyn KeyValueStore>,
}

impl Stores {
	pub fn new(local: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
		Self { local, session }
	}

	/// Two fresh in-memory stores.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
	}
}

/// Everything resolved while recording the pageview.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
	pub visitor: VisitorId,
	pub session: Session,
	pub utm: UtmParams,
	pub referrer: ReferrerCategory,
	/// Key the view was counted under in `sources`
	pub source: String,
	pub date: DateKey,
	pub loaded_at: DateTime<Utc>,
	pub outcome: RecordOutcome,
}

pub struct Tracker {
	app: AppName,
	recorder: EventRecorder,
	own_domains: Vec<String>,
	affiliate_hosts: Vec<String>,
	page: Option<PageView>,
}

impl Tracker {
	/// Records the pageview for `nav` and returns the handle for the page.
	pub fn start(
		config: &TrackerConfig,
		stores: &Stores,
		clock: Arc<dyn Clock>,
		nav: &NavigationContext,
	) -> Self {
		let app = app_namespace(&nav.path);
		let aggregates = AggregateStore::new(stores.local.clone(), config.keys.document.clone());
		let recorder = EventRecorder::new(aggregates, clock.clone(), config);

		let mut own_domains = config.own_domains.clone();
		let host = nav.host.trim().to_ascii_lowercase();
		if !host.is_empty() && !own_domains.contains(&host) {
			own_domains.push(host);
		}

		let mut tracker = Self {
			app,
			recorder,
			own_domains,
			affiliate_hosts: config.affiliate_hosts.clone(),
			page: None,
		};

		if tracker.app.is_admin() {
			debug!(path = %nav.path, "admin page, tracking disabled");
			return tracker;
		}

		let loaded_at = clock.now();
		let identity =
			IdentityProvider::new(stores.local.clone(), stores.session.clone(), clock.clone(), config);
		let visitor = identity.visitor_id();
		let session = identity.session();

		let utm = UtmParams::from_query(&nav.query);
		let referrer = ReferrerCategory::classify(&nav.referrer, &tracker.own_domains);
		let source = source_key(&utm, referrer);
		let date = clock.today();

		let outcome = tracker
			.recorder
			.record_pageview(&tracker.app, &visitor, &date, &source);

		info!(
			app = %tracker.app,
			visitor_id = %visitor,
			session_id = %session.id,
			source = %source,
			"analytics initialized"
		);

		tracker.page = Some(PageView {
			visitor,
			session,
			utm,
			referrer,
			source,
			date,
			loaded_at,
			outcome,
		});
		tracker
	}

	pub fn app(&self) -> &AppName {
		&self.app
	}

	/// False on pages that are never recorded.
	pub fn is_enabled(&self) -> bool {
		self.page.is_some()
	}

	pub fn page(&self) -> Option<&PageView> {
		self.page.as_ref()
	}

	pub fn recorder(&self) -> &EventRecorder {
		&self.recorder
	}

	/// Configured own domains plus the page's host.
	pub fn own_domains(&self) -> &[String] {
		&self.own_domains
	}

	pub fn affiliate_hosts(&self) -> &[String] {
		&self.affiliate_hosts
	}

	pub fn track_interaction(&self, name: &str) -> RecordOutcome {
		self.recorder.record_interaction(&self.app, name)
	}

	pub fn track_affiliate_click(&self, product: &str) -> RecordOutcome {
		self.recorder.record_affiliate_click(&self.app, product)
	}

	pub fn track_share(&self, platform: Option<&str>) -> RecordOutcome {
		self.recorder.record_share(&self.app, platform)
	}

	pub fn track_completion(&self, score: Option<f64>, max: Option<f64>) -> RecordOutcome {
		self.recorder.record_completion(&self.app, score, max)
	}

	/// Flushes time since the page loaded. Safe to call more than once; each
	/// call measures from the original load.
	pub fn flush_time_on_page(&self) -> RecordOutcome {
		match &self.page {
			Some(page) => self.recorder.record_time_on_page(&self.app, page.loaded_at),
			None => RecordOutcome::Skipped(SkipReason::AdminPage),
		}
	}
}
