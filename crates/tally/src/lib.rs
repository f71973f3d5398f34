// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embeddable recorder for Tally usage analytics.
//!
//! A [`Tracker`] is built once per page from the navigation context. Building
//! it records the pageview; afterwards each `track_*` call runs its own
//! load/mutate/save cycle against the shared document. Nothing here returns
//! an error to the host page: every call yields a [`RecordOutcome`] that may
//! be ignored.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tally::{NavigationContext, Stores, SystemClock, Tracker, TrackerConfig};
//!
//! let stores = Stores::in_memory();
//! let nav = NavigationContext::new("/quiz/")
//!     .with_referrer("https://www.google.com/")
//!     .with_host("tally.example");
//! let tracker = Tracker::start(&TrackerConfig::default(), &stores, Arc::new(SystemClock), &nav);
//!
//! tracker.track_completion(Some(8.0), Some(10.0));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod recorder;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SlotKeys, TrackerConfig};
pub use error::ConfigError;
pub use identity::IdentityProvider;
pub use lifecycle::{LifecycleEvent, LifecycleHooks, LinkTarget, Visibility, EXTERNAL_CLICK};
pub use recorder::{EventRecorder, RecordOutcome, SkipReason};
pub use tracker::{NavigationContext, PageView, Stores, Tracker};

pub use tally_core::{
	app_namespace, AnalyticsDocument, AppName, AppStats, DateKey, ReferrerCategory, Session,
	VisitorId,
};
pub use tally_store::{AggregateStore, FileStore, KeyValueStore, MemoryStore};
