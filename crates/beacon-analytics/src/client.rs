// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The public tracking client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use beacon_analytics_core::{check_properties, CallSite, EventType, Properties};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::args::{self, validate_args};
use crate::emitter::{BufferedEmitter, EmitterConfig, EmitterPhase};
use crate::envelope::{EnvelopeBuilder, RawEvent};
use crate::error::{AnalyticsError, ConfigError, Result};
use crate::hook::{FlushObserver, NoOpFlushObserver, SharedFlushObserver};
use crate::options::AnalyticsOptions;
use crate::submitter::{HttpSubmitter, Submitter};

/// Event name used by [`AnalyticsClient::track_signup`].
pub const SIGNUP_EVENT: &str = "$SignUp";

/// Builder for constructing an [`AnalyticsClient`].
pub struct AnalyticsClientBuilder {
	server_url: Option<String>,
	options: AnalyticsOptions,
	submitter: Option<Arc<dyn Submitter>>,
	observer: SharedFlushObserver,
}

impl AnalyticsClientBuilder {
	pub fn new() -> Self {
		Self {
			server_url: None,
			options: AnalyticsOptions::default(),
			submitter: None,
			observer: Arc::new(NoOpFlushObserver),
		}
	}

	/// Sets the ingestion endpoint. Overrides `options.server_url`.
	///
	/// Example: `https://ingest.example.com/sa?project=default`
	pub fn server_url(mut self, url: impl Into<String>) -> Self {
		self.server_url = Some(url.into());
		self
	}

	/// Replaces all options, e.g. with ones from [`AnalyticsOptions::load`].
	pub fn options(mut self, options: AnalyticsOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the number of buffered events that triggers a flush.
	pub fn buffer_count(mut self, count: usize) -> Self {
		self.options.buffer_count = count;
		self
	}

	/// Sets the maximum delay between flushes.
	pub fn buffer_window(mut self, window: Duration) -> Self {
		self.options.buffer_window = window;
		self
	}

	/// Enables debug mode: one request per event, sent to `/debug`.
	pub fn debug(mut self, enabled: bool) -> Self {
		self.options.debug = enabled;
		self
	}

	/// Sends batches through `submitter` instead of the HTTP transport.
	pub fn submitter(mut self, submitter: impl Submitter + 'static) -> Self {
		self.submitter = Some(Arc::new(submitter));
		self
	}

	/// Like [`submitter`](Self::submitter) for an already shared instance.
	pub fn shared_submitter(mut self, submitter: Arc<dyn Submitter>) -> Self {
		self.submitter = Some(submitter);
		self
	}

	/// Receives the outcome of every batch, including ones nobody awaits.
	pub fn observer(mut self, observer: impl FlushObserver) -> Self {
		self.observer = Arc::new(observer);
		self
	}

	/// Builds the client. Must be called inside a Tokio runtime.
	pub fn build(self) -> Result<AnalyticsClient> {
		let options = self.options;
		if options.buffer_count == 0 {
			return Err(ConfigError::InvalidValue {
				key: "buffer_count".to_string(),
				message: "must be at least 1".to_string(),
			}
			.into());
		}

		let submitter: Arc<dyn Submitter> = match self.submitter {
			Some(submitter) => {
				debug!("Analytics client initialized with custom submitter");
				submitter
			}
			None => {
				let url = self
					.server_url
					.or_else(|| options.server_url.clone())
					.ok_or_else(|| AnalyticsError::InvalidServerUrl("no server URL configured".to_string()))?;
				let http = HttpSubmitter::new(&url, &options)?;
				info!(url = %http.url(), debug = options.is_debug(), "Analytics client initialized");
				Arc::new(http)
			}
		};

		let envelope_builder = EnvelopeBuilder::new(options.date_zone)
			.with_snake_case_event_names(options.snake_case_event_names);
		let emitter = BufferedEmitter::new(EmitterConfig::from(&options), submitter, self.observer);

		Ok(AnalyticsClient {
			inner: Arc::new(ClientInner {
				options,
				envelope_builder,
				super_properties: RwLock::new(Properties::new()),
				emitter,
			}),
		})
	}
}

impl Default for AnalyticsClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct ClientInner {
	options: AnalyticsOptions,
	envelope_builder: EnvelopeBuilder,
	super_properties: RwLock<Properties>,
	emitter: BufferedEmitter,
}

/// Tracks events and profile updates and delivers them in batches.
///
/// Cheap to clone; clones share super properties and the buffer.
///
/// # Example
///
/// ```ignore
/// let client = AnalyticsClient::builder()
///     .server_url("https://ingest.example.com/sa?project=default")
///     .buffer_count(20)
///     .build()?;
///
/// client
///     .track("user-1", "ViewProduct", Properties::new().insert("productId", "sku-1"))
///     .await?;
/// client.close().await?;
/// ```
#[derive(Clone)]
pub struct AnalyticsClient {
	inner: Arc<ClientInner>,
}

impl AnalyticsClient {
	pub fn builder() -> AnalyticsClientBuilder {
		AnalyticsClientBuilder::new()
	}

	pub fn options(&self) -> &AnalyticsOptions {
		&self.inner.options
	}

	/// Records an event.
	///
	/// Arguments and properties are checked before anything is buffered; a
	/// validation error leaves the client untouched. The returned future
	/// completes once the event is buffered, not when it is delivered.
	#[track_caller]
	pub fn track(
		&self,
		distinct_id: impl Into<String>,
		event: impl Into<String>,
		properties: impl Into<Properties>,
	) -> impl Future<Output = Result<()>> + Send + '_ {
		let call_site = self.call_site();
		let distinct_id = distinct_id.into();
		let event = event.into();
		let properties = properties.into();

		let checked = validate_args(
			args::TRACK,
			&[(&distinct_id).into(), (&event).into(), (&properties).into()],
			self.inner.options.snake_case_event_names,
		);
		let raw = checked.map(|()| RawEvent {
			event_type: EventType::Track,
			event: Some(event),
			distinct_id,
			original_id: None,
			properties,
			call_site,
		});

		self.dispatch_call(raw.map_err(AnalyticsError::from))
	}

	/// Links an anonymous id to a signed-up user with a `$SignUp` event.
	#[track_caller]
	pub fn track_signup(
		&self,
		distinct_id: impl Into<String>,
		original_id: impl Into<String>,
		properties: impl Into<Properties>,
	) -> impl Future<Output = Result<()>> + Send + '_ {
		let call_site = self.call_site();
		let distinct_id = distinct_id.into();
		let original_id = original_id.into();
		let properties = properties.into();

		let checked = validate_args(
			args::TRACK_SIGNUP,
			&[(&distinct_id).into(), (&original_id).into(), (&properties).into()],
			false,
		);
		let raw = checked.map(|()| RawEvent {
			event_type: EventType::TrackSignup,
			event: Some(SIGNUP_EVENT.to_string()),
			distinct_id,
			original_id: Some(original_id),
			properties,
			call_site,
		});

		self.dispatch_call(raw.map_err(AnalyticsError::from))
	}

	/// Sets profile properties, overwriting existing values.
	#[track_caller]
	pub fn profile_set(
		&self,
		distinct_id: impl Into<String>,
		properties: impl Into<Properties>,
	) -> impl Future<Output = Result<()>> + Send + '_ {
		let call_site = self.call_site();
		self.profile_call(
			EventType::ProfileSet,
			args::PROFILE_SET,
			distinct_id.into(),
			properties.into(),
			call_site,
		)
	}

	/// Sets profile properties that are not set yet.
	#[track_caller]
	pub fn profile_set_once(
		&self,
		distinct_id: impl Into<String>,
		properties: impl Into<Properties>,
	) -> impl Future<Output = Result<()>> + Send + '_ {
		let call_site = self.call_site();
		self.profile_call(
			EventType::ProfileSetOnce,
			args::PROFILE_SET_ONCE,
			distinct_id.into(),
			properties.into(),
			call_site,
		)
	}

	/// Merges `properties` into the super properties and returns the result.
	///
	/// The bag is validated as a whole first; on error the current super
	/// properties are unchanged.
	pub async fn register_super_properties(
		&self,
		properties: impl Into<Properties>,
	) -> Result<Properties> {
		let mut candidate = properties.into();
		check_properties(&mut candidate, self.inner.options.date_zone)?;

		let mut supers = self.inner.super_properties.write().await;
		let merged = std::mem::take(&mut *supers).merge(candidate);
		*supers = merged;

		debug!(count = supers.len(), "Super properties registered");
		Ok(supers.clone())
	}

	pub async fn clear_super_properties(&self) {
		*self.inner.super_properties.write().await = Properties::new();
		debug!("Super properties cleared");
	}

	pub async fn super_properties(&self) -> Properties {
		self.inner.super_properties.read().await.clone()
	}

	/// Submits everything buffered and waits for delivery.
	pub async fn flush(&self) -> Result<()> {
		self.inner.emitter.flush().await
	}

	/// Stops accepting events and delivers what is buffered.
	///
	/// Tracking calls made afterwards fail with
	/// [`AnalyticsError::ClientShutdown`]. Closing again, from any clone,
	/// waits for the same drain; if it failed the error is reported as
	/// [`AnalyticsError::CloseFailed`].
	pub async fn close(&self) -> Result<()> {
		info!("Shutting down analytics client");
		self.inner.emitter.close().await
	}

	pub async fn phase(&self) -> EmitterPhase {
		self.inner.emitter.phase().await
	}

	#[track_caller]
	fn call_site(&self) -> Option<CallSite> {
		if self.inner.options.annotate_call_site {
			Some(CallSite::capture())
		} else {
			None
		}
	}

	fn profile_call(
		&self,
		event_type: EventType,
		rules: &[args::ArgRule],
		distinct_id: String,
		properties: Properties,
		call_site: Option<CallSite>,
	) -> impl Future<Output = Result<()>> + Send + '_ {
		let checked = validate_args(rules, &[(&distinct_id).into(), (&properties).into()], false);
		let raw = checked.map(|()| RawEvent {
			event_type,
			event: None,
			distinct_id,
			original_id: None,
			properties,
			call_site,
		});

		self.dispatch_call(raw.map_err(AnalyticsError::from))
	}

	async fn dispatch_call(&self, raw: Result<RawEvent>) -> Result<()> {
		let raw = raw?;
		let envelope = {
			let supers = self.inner.super_properties.read().await;
			self.inner.envelope_builder.build(raw, &supers)?
		};
		self.inner.emitter.enqueue(envelope).await
	}
}
