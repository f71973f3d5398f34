// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tally CLI
//!
//! Records analytics events into an on-disk store and prints the aggregate.
//! Each invocation is its own session scope, so sessions never outlive the
//! process.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tally::{
	app_namespace, AggregateStore, AppName, EventRecorder, FileStore, KeyValueStore,
	LifecycleEvent, LifecycleHooks, ManualClock, MemoryStore, NavigationContext, RecordOutcome,
	Stores, SystemClock, Tracker, TrackerConfig,
};

/// Tally - on-device usage analytics
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "TALLY_CONFIG")]
	config: Option<PathBuf>,

	/// Directory holding the persisted slots
	#[arg(short, long, env = "TALLY_DATA_DIR")]
	data_dir: Option<PathBuf>,

	/// Log filter used when RUST_LOG is unset
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	/// Output logs as JSON
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Record a pageview
	Visit {
		/// Page path, e.g. /quiz/level-2
		path: String,
		/// Query string carrying utm_* tags
		#[arg(long, default_value = "")]
		query: String,
		/// Referrer URL
		#[arg(long, default_value = "")]
		referrer: String,
		/// Host serving the page
		#[arg(long, default_value = "")]
		host: String,
		/// Seconds spent on the page before it was hidden
		#[arg(long)]
		stay: Option<u32>,
	},
	/// Count a named interaction
	Interaction {
		/// Page path the interaction happened on
		path: String,
		name: String,
	},
	/// Count a share
	Share {
		path: String,
		/// Platform shared to; "unknown" when omitted
		platform: Option<String>,
	},
	/// Count a completion, optionally with a score
	Complete {
		path: String,
		#[arg(long)]
		score: Option<f64>,
		#[arg(long)]
		max: Option<f64>,
	},
	/// Count an affiliate link click
	Affiliate {
		path: String,
		product: String,
	},
	/// Print the stored analytics document
	Show {
		/// Only print this app's stats
		#[arg(long)]
		app: Option<String>,
	},
}

fn main() -> Result<()> {
	let args = Args::parse();
	init_logging(&args.log_level, args.json_logs);

	let config = TrackerConfig::resolve(args.config.as_deref()).context("failed to load config")?;
	let store = match args.data_dir {
		Some(dir) => FileStore::new(dir),
		None => FileStore::from_xdg().context("failed to locate data directory")?,
	};
	debug!(dir = %store.dir().display(), "using file store");

	let stdout = io::stdout();
	run(args.command, &config, Arc::new(store), &mut stdout.lock())
}

fn init_logging(level: &str, json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(io::stderr))
			.init();
	}
}

fn run(
	command: Command,
	config: &TrackerConfig,
	store: Arc<dyn KeyValueStore>,
	out: &mut impl Write,
) -> Result<()> {
	match command {
		Command::Visit {
			path,
			query,
			referrer,
			host,
			stay,
		} => {
			let nav = NavigationContext::new(path)
				.with_query(query)
				.with_referrer(referrer)
				.with_host(host);
			let clock = Arc::new(ManualClock::new(Utc::now()));
			let stores = Stores::new(store, Arc::new(MemoryStore::new()));
			let tracker = Tracker::start(config, &stores, clock.clone(), &nav);

			let Some(page) = tracker.page() else {
				writeln!(out, "{}: not recorded", tracker.app())?;
				return Ok(());
			};
			report(out, tracker.app().as_str(), "pageview", page.outcome)?;
			writeln!(
				out,
				"  visitor {}  session {}  source {}",
				page.visitor, page.session.id, page.source
			)?;

			if let Some(secs) = stay {
				clock.advance(Duration::seconds(i64::from(secs)));
				let hooks = LifecycleHooks::new(&tracker);
				if let Some(outcome) = hooks.dispatch(&LifecycleEvent::Unload) {
					report(out, tracker.app().as_str(), "time on page", outcome)?;
				}
			}
		}
		Command::Interaction { path, name } => {
			let (app, recorder) = recorder_for(&path, config, store);
			report(out, app.as_str(), &name, recorder.record_interaction(&app, &name))?;
		}
		Command::Share { path, platform } => {
			let (app, recorder) = recorder_for(&path, config, store);
			report(out, app.as_str(), "share", recorder.record_share(&app, platform.as_deref()))?;
		}
		Command::Complete { path, score, max } => {
			let (app, recorder) = recorder_for(&path, config, store);
			report(out, app.as_str(), "completion", recorder.record_completion(&app, score, max))?;
		}
		Command::Affiliate { path, product } => {
			let (app, recorder) = recorder_for(&path, config, store);
			report(
				out,
				app.as_str(),
				"affiliate click",
				recorder.record_affiliate_click(&app, &product),
			)?;
		}
		Command::Show { app } => {
			let doc = AggregateStore::new(store, config.keys.document.clone()).load();
			let text = match app {
				Some(name) => {
					let stats = doc
						.app(&name.as_str().into())
						.with_context(|| format!("no stats recorded for app '{name}'"))?;
					serde_json::to_string_pretty(stats)?
				}
				None => serde_json::to_string_pretty(&doc)?,
			};
			writeln!(out, "{text}")?;
		}
	}
	Ok(())
}

fn recorder_for(
	path: &str,
	config: &TrackerConfig,
	store: Arc<dyn KeyValueStore>,
) -> (AppName, EventRecorder) {
	let aggregates = AggregateStore::new(store, config.keys.document.clone());
	let recorder = EventRecorder::new(aggregates, Arc::new(SystemClock), config);
	(app_namespace(path), recorder)
}

fn report(out: &mut impl Write, app: &str, what: &str, outcome: RecordOutcome) -> io::Result<()> {
	if outcome == RecordOutcome::Dropped {
		warn!(app, what, "write was dropped by the store");
	}
	writeln!(out, "{app}: {what} {outcome:?}")
}
