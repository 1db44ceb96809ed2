// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client options and the sources they are loaded from.
//!
//! Options are assembled from layers: built-in defaults, then an optional
//! TOML file, then `BEACON_ANALYTICS_*` environment variables. Each later
//! layer overrides the fields it sets.
//!
//! ```toml
//! server_url = "https://ingest.example.com/sa"
//! timeout_ms = 5000
//! gzip = true
//! dry_run = false
//! mode = "track"            # or "debug"
//! buffer_count = 20
//! buffer_window_secs = 5
//! date_zone = "utc"         # or "local"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use beacon_analytics_core::DateZone;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;

/// Prefix of every environment variable read by [`EnvSource`].
pub const ENV_PREFIX: &str = "BEACON_ANALYTICS_";

/// Delivery mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	#[default]
	Track,
	/// Unbatched delivery to the `/debug` endpoint.
	Debug,
}

impl FromStr for Mode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"track" => Ok(Mode::Track),
			"debug" => Ok(Mode::Debug),
			other => Err(format!("unknown mode '{other}'")),
		}
	}
}

/// Fully resolved client options.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsOptions {
	/// Ingestion endpoint; may also be given to the client builder.
	pub server_url: Option<String>,
	/// HTTP request timeout.
	pub timeout: Duration,
	/// Gzip the batch before base64 encoding it.
	pub gzip: bool,
	/// Ask the server to validate without storing.
	pub dry_run: bool,
	/// Flush every event immediately.
	pub debug: bool,
	pub mode: Mode,
	/// Flush once this many events are buffered.
	pub buffer_count: usize,
	/// Flush at most this long after the previous flush.
	pub buffer_window: Duration,
	/// Zone for rendering date properties.
	pub date_zone: DateZone,
	/// Snake-case the event name of `track` calls.
	pub snake_case_event_names: bool,
	/// Record the application call site in each envelope's `lib` bag.
	pub annotate_call_site: bool,
}

impl Default for AnalyticsOptions {
	fn default() -> Self {
		Self {
			server_url: None,
			timeout: Duration::from_millis(5000),
			gzip: true,
			dry_run: false,
			debug: false,
			mode: Mode::Track,
			buffer_count: 1,
			buffer_window: Duration::from_secs(5),
			date_zone: DateZone::Utc,
			snake_case_event_names: false,
			annotate_call_site: true,
		}
	}
}

impl AnalyticsOptions {
	/// True when either the `debug` flag or `mode = "debug"` is set.
	pub fn is_debug(&self) -> bool {
		self.debug || self.mode == Mode::Debug
	}

	/// Loads options from an optional TOML file and the process environment.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut sources: Vec<Box<dyn OptionsSource>> = Vec::new();
		if let Some(path) = path {
			sources.push(Box::new(TomlSource::new(path)));
		}
		sources.push(Box::new(EnvSource::new()));
		Self::from_sources(&sources)
	}

	/// Merges the given sources in order and finalizes the result.
	pub fn from_sources(sources: &[Box<dyn OptionsSource>]) -> Result<Self, ConfigError> {
		let mut layer = AnalyticsOptionsLayer::default();
		for source in sources {
			debug!(source = source.name(), "loading analytics options");
			layer.merge(source.load()?);
		}
		layer.finalize()
	}
}

/// A partial set of options; unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOptionsLayer {
	pub server_url: Option<String>,
	#[serde(alias = "timeout")]
	pub timeout_ms: Option<u64>,
	pub gzip: Option<bool>,
	#[serde(alias = "dryRun")]
	pub dry_run: Option<bool>,
	pub debug: Option<bool>,
	pub mode: Option<Mode>,
	#[serde(alias = "buffCount")]
	pub buffer_count: Option<usize>,
	#[serde(alias = "buffTimeSecs")]
	pub buffer_window_secs: Option<u64>,
	pub date_zone: Option<DateZone>,
	pub snake_case_event_names: Option<bool>,
	pub annotate_call_site: Option<bool>,
}

impl AnalyticsOptionsLayer {
	pub fn merge(&mut self, other: Self) {
		if other.server_url.is_some() {
			self.server_url = other.server_url;
		}
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.gzip.is_some() {
			self.gzip = other.gzip;
		}
		if other.dry_run.is_some() {
			self.dry_run = other.dry_run;
		}
		if other.debug.is_some() {
			self.debug = other.debug;
		}
		if other.mode.is_some() {
			self.mode = other.mode;
		}
		if other.buffer_count.is_some() {
			self.buffer_count = other.buffer_count;
		}
		if other.buffer_window_secs.is_some() {
			self.buffer_window_secs = other.buffer_window_secs;
		}
		if other.date_zone.is_some() {
			self.date_zone = other.date_zone;
		}
		if other.snake_case_event_names.is_some() {
			self.snake_case_event_names = other.snake_case_event_names;
		}
		if other.annotate_call_site.is_some() {
			self.annotate_call_site = other.annotate_call_site;
		}
	}

	pub fn finalize(self) -> Result<AnalyticsOptions, ConfigError> {
		let defaults = AnalyticsOptions::default();

		let buffer_count = self.buffer_count.unwrap_or(defaults.buffer_count);
		if buffer_count == 0 {
			return Err(ConfigError::InvalidValue {
				key: "buffer_count".to_string(),
				message: "must be at least 1".to_string(),
			});
		}

		let timeout = self
			.timeout_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.timeout);
		if timeout.is_zero() {
			return Err(ConfigError::InvalidValue {
				key: "timeout_ms".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(AnalyticsOptions {
			server_url: self.server_url.or(defaults.server_url),
			timeout,
			gzip: self.gzip.unwrap_or(defaults.gzip),
			dry_run: self.dry_run.unwrap_or(defaults.dry_run),
			debug: self.debug.unwrap_or(defaults.debug),
			mode: self.mode.unwrap_or(defaults.mode),
			buffer_count,
			buffer_window: self
				.buffer_window_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.buffer_window),
			date_zone: self.date_zone.unwrap_or(defaults.date_zone),
			snake_case_event_names: self
				.snake_case_event_names
				.unwrap_or(defaults.snake_case_event_names),
			annotate_call_site: self
				.annotate_call_site
				.unwrap_or(defaults.annotate_call_site),
		})
	}
}

/// A source of option layers.
pub trait OptionsSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn load(&self) -> Result<AnalyticsOptionsLayer, ConfigError>;
}

/// TOML file source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl OptionsSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn load(&self) -> Result<AnalyticsOptionsLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AnalyticsOptionsLayer::default());
		}

		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed analytics options from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `BEACON_ANALYTICS_<FIELD>`, e.g. `BEACON_ANALYTICS_BUFFER_COUNT`.
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads from the process environment.
	pub fn new() -> Self {
		Self { vars: None }
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
		}
	}

	fn var(&self, field: &str) -> Option<String> {
		let name = format!("{ENV_PREFIX}{field}");
		let value = match &self.vars {
			Some(vars) => vars.get(&name).cloned(),
			None => std::env::var(&name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, field: &str) -> Option<bool> {
		self
			.var(field)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: FromStr>(&self, field: &str) -> Result<Option<T>, ConfigError>
	where
		T::Err: std::fmt::Display,
	{
		match self.var(field) {
			Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: format!("{ENV_PREFIX}{field}"),
				message: format!("invalid value '{v}': {e}"),
			}),
			None => Ok(None),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl OptionsSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn load(&self) -> Result<AnalyticsOptionsLayer, ConfigError> {
		let date_zone = match self.var("DATE_ZONE") {
			Some(v) => Some(parse_date_zone(&v).ok_or_else(|| ConfigError::InvalidValue {
				key: format!("{ENV_PREFIX}DATE_ZONE"),
				message: format!("expected 'utc' or 'local', got '{v}'"),
			})?),
			None => None,
		};

		Ok(AnalyticsOptionsLayer {
			server_url: self.var("SERVER_URL"),
			timeout_ms: self.parsed("TIMEOUT_MS")?,
			gzip: self.bool("GZIP"),
			dry_run: self.bool("DRY_RUN"),
			debug: self.bool("DEBUG"),
			mode: self.parsed("MODE")?,
			buffer_count: self.parsed("BUFFER_COUNT")?,
			buffer_window_secs: self.parsed("BUFFER_WINDOW_SECS")?,
			date_zone,
			snake_case_event_names: self.bool("SNAKE_CASE_EVENT_NAMES"),
			annotate_call_site: self.bool("ANNOTATE_CALL_SITE"),
		})
	}
}

fn parse_date_zone(value: &str) -> Option<DateZone> {
	match value.to_ascii_lowercase().as_str() {
		"utc" => Some(DateZone::Utc),
		"local" => Some(DateZone::Local),
		_ => None,
	}
}
