// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page lifecycle bindings.
//!
//! The host forwards unload, visibility and link-click events here. Delivery
//! is best-effort: an event that never arrives is simply not counted.

use tracing::debug;
use url::Url;

use crate::recorder::RecordOutcome;
use crate::tracker::Tracker;

/// Interaction key counting clicks on links leaving the site.
pub const EXTERNAL_CLICK: &str = "external_click";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
	Visible,
	Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
	Unload,
	VisibilityChanged(Visibility),
	/// A click whose nearest enclosing link is `href`. `None` when the click
	/// landed outside any link.
	LinkClick {
		href: Option<String>,
		text: Option<String>,
	},
}

/// Where a clicked link leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
	Affiliate,
	External,
	Internal,
}

impl LinkTarget {
	/// Relative and non-web links are internal. Affiliate hosts win over the
	/// own-domain check.
	pub fn classify<S: AsRef<str>>(href: &str, own_domains: &[S], affiliate_hosts: &[S]) -> Self {
		let url = match Url::parse(href.trim()) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => url,
			_ => return Self::Internal,
		};

		let lowered = url.as_str().to_ascii_lowercase();
		let affiliate = affiliate_hosts
			.iter()
			.map(|h| h.as_ref().trim().to_ascii_lowercase())
			.any(|h| !h.is_empty() && lowered.contains(&h));
		if affiliate {
			return Self::Affiliate;
		}

		let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
		let own = own_domains.iter().any(|d| {
			let d = d.as_ref().trim().to_ascii_lowercase();
			!d.is_empty() && (host == d || host.ends_with(&format!(".{d}")))
		});
		if own {
			Self::Internal
		} else {
			Self::External
		}
	}
}

/// Routes lifecycle events to the page's [`Tracker`].
pub struct LifecycleHooks<'a> {
	tracker: &'a Tracker,
}

impl<'a> LifecycleHooks<'a> {
	pub fn new(tracker: &'a Tracker) -> Self {
		Self { tracker }
	}

	/// Handles one event. Returns `None` when the event records nothing.
	pub fn dispatch(&self, event: &LifecycleEvent) -> Option<RecordOutcome> {
		match event {
			LifecycleEvent::Unload | LifecycleEvent::VisibilityChanged(Visibility::Hidden) => {
				Some(self.tracker.flush_time_on_page())
			}
			LifecycleEvent::VisibilityChanged(Visibility::Visible) => None,
			LifecycleEvent::LinkClick { href: None, .. } => None,
			LifecycleEvent::LinkClick {
				href: Some(href),
				text,
			} => self.link_click(href, text.as_deref()),
		}
	}

	fn link_click(&self, href: &str, text: Option<&str>) -> Option<RecordOutcome> {
		let target = LinkTarget::classify(
			href,
			self.tracker.own_domains(),
			self.tracker.affiliate_hosts(),
		);
		debug!(href, ?target, "link click");

		match target {
			LinkTarget::Affiliate => {
				let product = text.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(href);
				Some(self.tracker.track_affiliate_click(product))
			}
			LinkTarget::External => Some(self.tracker.track_interaction(EXTERNAL_CLICK)),
			LinkTarget::Internal => None,
		}
	}
}
