// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Navigation context classification: app namespace, UTM tags and referrer
//! category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::AppName;

/// Home document name that maps to the homepage namespace.
const HOME_DOCUMENT: &str = "index.html";

/// Maps a page path to the app it belongs to.
///
/// The first path segment names the app. The site root and the home document
/// belong to [`AppName::HOMEPAGE`].
pub fn app_namespace(path: &str) -> AppName {
	let trimmed = path.trim_matches('/');
	if trimmed.is_empty() || trimmed == HOME_DOCUMENT {
		return AppName::homepage();
	}
	let segment = trimmed.split('/').next().unwrap_or(trimmed);
	AppName::new(segment)
}

/// Campaign tags from the query string. Missing tags are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
	pub source: String,
	pub medium: String,
	pub campaign: String,
}

impl UtmParams {
	/// Parses `utm_source`, `utm_medium` and `utm_campaign`, with or without a
	/// leading `?`. The first occurrence of a repeated tag wins.
	pub fn from_query(query: &str) -> Self {
		let query = query.strip_prefix('?').unwrap_or(query);
		let (mut source, mut medium, mut campaign) = (None, None, None);

		for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
			let slot = match &*key {
				"utm_source" => &mut source,
				"utm_medium" => &mut medium,
				"utm_campaign" => &mut campaign,
				_ => continue,
			};
			if slot.is_none() {
				*slot = Some(value.into_owned());
			}
		}

		Self {
			source: source.unwrap_or_default(),
			medium: medium.unwrap_or_default(),
			campaign: campaign.unwrap_or_default(),
		}
	}
}

/// Where a visit came from, judged by its referrer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferrerCategory {
	/// No referrer
	Direct,
	/// Another page on one of our own domains
	Internal,
	Search,
	Twitter,
	Reddit,
	/// Facebook and Instagram
	Social,
	/// Anything else
	Referral,
}

/// Ordered matching rules applied after the direct and internal checks.
/// The first rule with a matching substring decides the category.
const RULES: &[(&[&str], ReferrerCategory)] = &[
	(
		&[
			"google.",
			"bing.",
			"duckduckgo.",
			"yahoo.",
			"baidu.",
			"yandex.",
			"ecosia.",
		],
		ReferrerCategory::Search,
	),
	(&["twitter.com", "//x.com", ".x.com"], ReferrerCategory::Twitter),
	(&["reddit.com"], ReferrerCategory::Reddit),
	(&["facebook.com", "instagram.com"], ReferrerCategory::Social),
	// Twitter's link shortener, checked last so that it cannot shadow the
	// longer hosts above.
	(&["//t.co/"], ReferrerCategory::Twitter),
];

impl ReferrerCategory {
	/// Classifies a referrer URL. Matching is case-insensitive and substring
	/// based; an own-domain hit wins over every other rule.
	pub fn classify<S: AsRef<str>>(referrer: &str, own_domains: &[S]) -> Self {
		let referrer = referrer.trim().to_ascii_lowercase();
		if referrer.is_empty() {
			return Self::Direct;
		}

		let internal = own_domains
			.iter()
			.map(|d| d.as_ref().trim().to_ascii_lowercase())
			.any(|d| !d.is_empty() && referrer.contains(&d));
		if internal {
			return Self::Internal;
		}

		RULES
			.iter()
			.find(|(patterns, _)| patterns.iter().any(|p| referrer.contains(p)))
			.map(|(_, category)| *category)
			.unwrap_or(Self::Referral)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Direct => "direct",
			Self::Internal => "internal",
			Self::Search => "search",
			Self::Twitter => "twitter",
			Self::Reddit => "reddit",
			Self::Social => "social",
			Self::Referral => "referral",
		}
	}
}

impl fmt::Display for ReferrerCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ReferrerCategory {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"direct" => Ok(Self::Direct),
			"internal" => Ok(Self::Internal),
			"search" => Ok(Self::Search),
			"twitter" => Ok(Self::Twitter),
			"reddit" => Ok(Self::Reddit),
			"social" => Ok(Self::Social),
			"referral" => Ok(Self::Referral),
			_ => Err(CoreError::InvalidCategory(s.to_string())),
		}
	}
}

/// The key a pageview is counted under in `sources`: the UTM source when
/// tagged, otherwise the referrer category.
pub fn source_key(utm: &UtmParams, category: ReferrerCategory) -> String {
	if utm.source.is_empty() {
		category.as_str().to_string()
	} else {
		utm.source.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const OWN: &[&str] = &["tally.example"];

	#[test]
	fn test_app_namespace() {
		assert_eq!(app_namespace("/").as_str(), "_homepage");
		assert_eq!(app_namespace("").as_str(), "_homepage");
		assert_eq!(app_namespace("/index.html").as_str(), "_homepage");
		assert_eq!(app_namespace("/quiz").as_str(), "quiz");
		assert_eq!(app_namespace("/quiz/").as_str(), "quiz");
		assert_eq!(app_namespace("quiz/level/2").as_str(), "quiz");
		assert!(app_namespace("/admin/anything").is_admin());
	}

	#[test]
	fn test_utm_defaults_to_empty() {
		assert_eq!(UtmParams::from_query(""), UtmParams::default());
		assert_eq!(UtmParams::from_query("?page=2"), UtmParams::default());
	}

	#[test]
	fn test_utm_parses_and_decodes() {
		let utm = UtmParams::from_query("?utm_source=news%20letter&utm_medium=email&utm_campaign=spring+sale");
		assert_eq!(utm.source, "news letter");
		assert_eq!(utm.medium, "email");
		assert_eq!(utm.campaign, "spring sale");
	}

	#[test]
	fn test_utm_first_occurrence_wins() {
		let utm = UtmParams::from_query("utm_source=a&utm_source=b");
		assert_eq!(utm.source, "a");
	}

	#[test]
	fn test_referrer_categories() {
		let cases = [
			("", ReferrerCategory::Direct),
			("   ", ReferrerCategory::Direct),
			("https://tally.example/quiz", ReferrerCategory::Internal),
			("https://www.google.com/", ReferrerCategory::Search),
			("https://duckduckgo.com/?q=x", ReferrerCategory::Search),
			("https://twitter.com/someone", ReferrerCategory::Twitter),
			("https://x.com/someone", ReferrerCategory::Twitter),
			("https://t.co/abc123", ReferrerCategory::Twitter),
			("https://www.reddit.com/r/puzzles", ReferrerCategory::Reddit),
			("https://old.reddit.com/", ReferrerCategory::Reddit),
			("https://l.facebook.com/", ReferrerCategory::Social),
			("https://www.instagram.com/", ReferrerCategory::Social),
			("https://news.ycombinator.com/", ReferrerCategory::Referral),
			("https://netflix.com/", ReferrerCategory::Referral),
		];
		for (referrer, expected) in cases {
			assert_eq!(ReferrerCategory::classify(referrer, OWN), expected, "{referrer}");
		}
	}

	#[test]
	fn test_own_domain_precedes_search() {
		let referrer = "https://www.google.com/url?q=https://tally.example/";
		assert_eq!(
			ReferrerCategory::classify(referrer, OWN),
			ReferrerCategory::Internal
		);
	}

	#[test]
	fn test_search_precedes_platforms() {
		let referrer = "https://www.google.com/search?q=reddit.com";
		assert_eq!(
			ReferrerCategory::classify(referrer, OWN),
			ReferrerCategory::Search
		);
	}

	#[test]
	fn test_classify_is_case_insensitive() {
		assert_eq!(
			ReferrerCategory::classify("HTTPS://WWW.REDDIT.COM/", OWN),
			ReferrerCategory::Reddit
		);
	}

	#[test]
	fn test_empty_own_domain_is_ignored() {
		assert_eq!(
			ReferrerCategory::classify("https://example.org/", &[""]),
			ReferrerCategory::Referral
		);
	}

	#[test]
	fn test_source_key_prefers_utm() {
		let utm = UtmParams::from_query("utm_source=newsletter");
		assert_eq!(source_key(&utm, ReferrerCategory::Search), "newsletter");
		assert_eq!(
			source_key(&UtmParams::default(), ReferrerCategory::Search),
			"search"
		);
	}

	proptest! {
		#[test]
		fn category_roundtrip(category in prop_oneof![
			Just(ReferrerCategory::Direct),
			Just(ReferrerCategory::Internal),
			Just(ReferrerCategory::Search),
			Just(ReferrerCategory::Twitter),
			Just(ReferrerCategory::Reddit),
			Just(ReferrerCategory::Social),
			Just(ReferrerCategory::Referral),
		]) {
			let parsed: ReferrerCategory = category.to_string().parse().unwrap();
			prop_assert_eq!(category, parsed);
		}

		#[test]
		fn namespace_is_first_segment(first in "[a-z]{1,10}", rest in "(/[a-z0-9]{0,6}){0,3}") {
			let path = format!("/{first}{rest}");
			let ns = app_namespace(&path);
			prop_assert_eq!(ns.as_str(), first.as_str());
		}

		#[test]
		fn non_empty_referrer_is_never_direct(referrer in "[a-z]{1,20}") {
			prop_assert_ne!(ReferrerCategory::classify(&referrer, OWN), ReferrerCategory::Direct);
		}
	}
}
