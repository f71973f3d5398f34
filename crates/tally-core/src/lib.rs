// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Tally, an on-device usage analytics recorder.
//!
//! This crate holds everything that does not touch storage or the clock:
//!
//! - identifiers for visitors, sessions, apps and calendar days
//! - the [`Session`] record and its idle-timeout rules
//! - the [`AnalyticsDocument`] aggregate and its mutation helpers
//! - the [`wire`] boundary that repairs documents read back from plain text
//! - the [`classify`] functions that turn navigation context into an app
//!   namespace and a traffic source

pub mod classify;
pub mod document;
pub mod error;
pub mod ids;
pub mod session;
pub mod wire;

pub use classify::{app_namespace, source_key, ReferrerCategory, UtmParams};
pub use document::{
	AnalyticsDocument, AppStats, GlobalStats, InteractionValue, ScoreRecord, AFFILIATE_CLICK,
	COMPLETED, SCORES,
};
pub use error::CoreError;
pub use ids::{AppName, DateKey, SessionId, VisitorId};
pub use session::Session;
pub use wire::{decode_document, encode_document};
