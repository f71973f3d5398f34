// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Text boundary for [`AnalyticsDocument`].
//!
//! The backing store only keeps strings, and other tabs or older versions may
//! have written anything. Decoding therefore never fails on a JSON object:
//! every field falls back to its default when it has the wrong shape, and
//! only text that is not an object at all is rejected. Set-valued fields are arrays on disk
//! and [`BTreeSet`]s in memory; nothing else converts between the two.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::document::{AnalyticsDocument, AppStats, InteractionValue};
use crate::error::CoreError;
use crate::ids::{AppName, VisitorId};

/// Decodes persisted text, repairing whatever does not fit the model.
///
/// Returns `None` only when the text is not a JSON object at all, so callers
/// can tell a reset from an empty document.
pub fn decode_document(text: &str) -> Option<AnalyticsDocument> {
	match serde_json::from_str::<Value>(text) {
		Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
		_ => None,
	}
}

/// Encodes a document, flattening sets into sorted arrays.
pub fn encode_document(doc: &AnalyticsDocument) -> Result<String, CoreError> {
	Ok(serde_json::to_string(doc)?)
}

/// Any value of the wrong shape becomes `T::default()`.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned + Default,
{
	let value = Value::deserialize(deserializer)?;
	Ok(from_object_or_scalar(value).unwrap_or_default())
}

pub(crate) fn visitor_set<'de, D>(deserializer: D) -> Result<BTreeSet<VisitorId>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	Ok(string_items(value).map(VisitorId::from_string).collect())
}

pub(crate) fn visitor_list<'de, D>(deserializer: D) -> Result<Vec<VisitorId>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	let mut visitors: Vec<VisitorId> = Vec::new();
	for id in string_items(value).map(VisitorId::from_string) {
		if !visitors.contains(&id) {
			visitors.push(id);
		}
	}
	Ok(visitors)
}

/// Keeps the entries whose key and count both decode.
pub(crate) fn counter_map<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, u64>, D::Error>
where
	D: Deserializer<'de>,
	K: DeserializeOwned + Ord,
{
	let value = Value::deserialize(deserializer)?;
	Ok(object_entries(value)
		.filter_map(|(key, count)| Some((decode_key(key)?, count.as_u64()?)))
		.collect())
}

pub(crate) fn interaction_map<'de, D>(
	deserializer: D,
) -> Result<BTreeMap<String, InteractionValue>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	Ok(object_entries(value)
		.filter_map(|(name, value)| Some((name, serde_json::from_value(value).ok()?)))
		.collect())
}

pub(crate) fn app_map<'de, D>(deserializer: D) -> Result<BTreeMap<AppName, AppStats>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	Ok(object_entries(value)
		.filter(|(_, stats)| stats.is_object())
		.filter_map(|(name, stats)| Some((AppName::new(name), serde_json::from_value(stats).ok()?)))
		.collect())
}

// Arrays are refused so that derived structs never decode positionally.
fn from_object_or_scalar<T: DeserializeOwned>(value: Value) -> Option<T> {
	if value.is_array() {
		return None;
	}
	serde_json::from_value(value).ok()
}

fn decode_key<K: DeserializeOwned>(key: String) -> Option<K> {
	serde_json::from_value(Value::String(key)).ok()
}

fn string_items(value: Value) -> impl Iterator<Item = String> {
	let items = match value {
		Value::Array(items) => items,
		_ => Vec::new(),
	};
	items.into_iter().filter_map(|item| match item {
		Value::String(s) => Some(s),
		_ => None,
	})
}

fn object_entries(value: Value) -> impl Iterator<Item = (String, Value)> {
	let map = match value {
		Value::Object(map) => map,
		_ => serde_json::Map::new(),
	};
	map.into_iter()
}
