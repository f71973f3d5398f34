// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Precedence, lowest first: defaults, config file, environment.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Comma-separated own domains, appended to the configured list.
pub const ENV_OWN_DOMAINS: &str = "TALLY_OWN_DOMAINS";
/// Comma-separated affiliate hosts, replacing the configured list.
pub const ENV_AFFILIATE_HOSTS: &str = "TALLY_AFFILIATE_HOSTS";

/// Names of the three persistence slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotKeys {
	/// Long-lived visitor identifier
	pub visitor: String,
	/// Tab-scoped session record
	pub session: String,
	/// Long-lived analytics document
	pub document: String,
}

impl Default for SlotKeys {
	fn default() -> Self {
		Self {
			visitor: "tally_visitor".to_string(),
			session: "tally_session".to_string(),
			document: "tally_analytics".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
	pub keys: SlotKeys,
	pub session_idle_timeout_secs: u64,
	pub min_time_on_page_secs: u64,
	pub max_time_on_page_secs: u64,
	/// Length of the per-app score log
	pub max_scores: usize,
	/// Referrers and links on these domains count as internal. The page's own
	/// host is always added at runtime.
	pub own_domains: Vec<String>,
	/// Substrings that mark a link as an affiliate marketplace link
	pub affiliate_hosts: Vec<String>,
}

impl Default for TrackerConfig {
	fn default() -> Self {
		Self {
			keys: SlotKeys::default(),
			session_idle_timeout_secs: 30 * 60,
			min_time_on_page_secs: 1,
			max_time_on_page_secs: 60 * 60,
			max_scores: 100,
			own_domains: Vec::new(),
			affiliate_hosts: vec!["amazon.".to_string(), "amzn.to".to_string()],
		}
	}
}

impl TrackerConfig {
	/// Parses and validates TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads and validates a config file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path)?;
		let config: Self = toml::from_str(&text).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})?;
		config.validate()?;
		Ok(config)
	}

	/// Loads `path` if given, else the user config file when it exists, else
	/// defaults; then applies environment overrides.
	pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
		let config = match path {
			Some(path) => Self::load(path)?,
			None => match user_config_file() {
				Some(path) if path.exists() => Self::load(&path)?,
				_ => Self::default(),
			},
		};

		let config = config.with_env_overrides(|name| std::env::var(name).ok());
		config.validate()?;

		tracing::debug!(
			own_domains = ?config.own_domains,
			affiliate_hosts = ?config.affiliate_hosts,
			"resolved tracker config"
		);

		Ok(config)
	}

	/// Applies `TALLY_*` overrides read through `lookup`.
	pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(domains) = lookup(ENV_OWN_DOMAINS) {
			for domain in split_list(&domains) {
				if !self.own_domains.contains(&domain) {
					self.own_domains.push(domain);
				}
			}
		}
		if let Some(hosts) = lookup(ENV_AFFILIATE_HOSTS) {
			self.affiliate_hosts = split_list(&hosts);
		}
		self
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.min_time_on_page_secs > self.max_time_on_page_secs {
			return Err(ConfigError::validation(format!(
				"time-on-page window is empty: {}..={}",
				self.min_time_on_page_secs, self.max_time_on_page_secs
			)));
		}
		if self.max_scores == 0 {
			return Err(ConfigError::validation("max_scores must be at least 1"));
		}
		if self.session_idle_timeout_secs == 0 {
			return Err(ConfigError::validation(
				"session_idle_timeout_secs must be at least 1",
			));
		}
		let keys = [&self.keys.visitor, &self.keys.session, &self.keys.document];
		if keys.iter().any(|k| k.trim().is_empty()) {
			return Err(ConfigError::validation("slot keys must not be empty"));
		}
		if keys[0] == keys[1] || keys[0] == keys[2] || keys[1] == keys[2] {
			return Err(ConfigError::validation("slot keys must be distinct"));
		}
		Ok(())
	}

	pub fn session_idle_timeout(&self) -> Duration {
		let secs = self.session_idle_timeout_secs.min(u64::from(u32::MAX));
		Duration::seconds(secs as i64)
	}

	pub fn time_on_page_window(&self) -> RangeInclusive<u64> {
		self.min_time_on_page_secs..=self.max_time_on_page_secs
	}
}

/// `$XDG_CONFIG_HOME/tally/config.toml`
pub fn user_config_file() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("tally").join("config.toml"))
}

fn split_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	#[test]
	fn test_defaults_are_valid() {
		let config = TrackerConfig::default();
		config.validate().unwrap();
		assert_eq!(config.session_idle_timeout(), Duration::minutes(30));
		assert_eq!(config.time_on_page_window(), 1..=3600);
		assert_eq!(config.max_scores, 100);
	}

	#[test]
	fn test_empty_toml_is_default() {
		assert_eq!(
			TrackerConfig::from_toml_str("").unwrap(),
			TrackerConfig::default()
		);
	}

	#[test]
	fn test_partial_toml() {
		let config = TrackerConfig::from_toml_str(
			r#"
own_domains = ["tally.example"]
max_scores = 20

[keys]
document = "analytics_v2"
"#,
		)
		.unwrap();

		assert_eq!(config.own_domains, vec!["tally.example"]);
		assert_eq!(config.max_scores, 20);
		assert_eq!(config.keys.document, "analytics_v2");
		assert_eq!(config.keys.visitor, "tally_visitor");
	}

	#[test]
	fn test_rejects_empty_window() {
		let result = TrackerConfig::from_toml_str(
			"min_time_on_page_secs = 10\nmax_time_on_page_secs = 5\n",
		);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_rejects_shared_slot_keys() {
		let result = TrackerConfig::from_toml_str("[keys]\nvisitor = \"x\"\nsession = \"x\"\n");
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_rejects_bad_toml() {
		let result = TrackerConfig::from_toml_str("max_scores = \"lots\"");
		assert!(matches!(result, Err(ConfigError::Toml(_))));
	}

	#[test]
	fn test_load_reports_path() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("config.toml");
		std::fs::write(&path, "own_domains = 3").unwrap();

		match TrackerConfig::load(&path) {
			Err(ConfigError::TomlParse { path: reported, .. }) => assert_eq!(reported, path),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn test_env_overrides() {
		let env: HashMap<&str, &str> = [
			(ENV_OWN_DOMAINS, "tally.example, www.tally.example,,"),
			(ENV_AFFILIATE_HOSTS, "shop.example"),
		]
		.into_iter()
		.collect();

		let config = TrackerConfig {
			own_domains: vec!["tally.example".to_string()],
			..TrackerConfig::default()
		}
		.with_env_overrides(|name| env.get(name).map(|v| v.to_string()));

		assert_eq!(config.own_domains, vec!["tally.example", "www.tally.example"]);
		assert_eq!(config.affiliate_hosts, vec!["shop.example"]);
	}
}
