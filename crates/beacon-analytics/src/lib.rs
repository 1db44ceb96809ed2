// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK client for Beacon event tracking.
//!
//! Tracking calls are validated and turned into envelopes synchronously,
//! then buffered and delivered in batches by a background task.
//!
//! # Example
//!
//! ```ignore
//! use beacon_analytics::{AnalyticsClient, Properties};
//!
//! #[tokio::main]
//! async fn main() -> beacon_analytics::Result<()> {
//!     let client = AnalyticsClient::builder()
//!         .server_url("https://ingest.example.com/sa?project=default")
//!         .build()?;
//!
//!     client
//!         .register_super_properties(Properties::new().insert("$appVersion", "1.2.0"))
//!         .await?;
//!
//!     client
//!         .track(
//!             "user-123",
//!             "ViewProduct",
//!             Properties::new().insert("productId", "sku-1").insert("price", 99.99),
//!         )
//!         .await?;
//!
//!     client
//!         .profile_set("user-123", Properties::new().insert("plan", "pro"))
//!         .await?;
//!
//!     // Delivers whatever is still buffered.
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Batching
//!
//! With the default options every event is sent on its own. Raise
//! `buffer_count` to batch; a batch is then sent when it is full, when an
//! event arrives after `buffer_window` has elapsed since the previous batch,
//! or when the deferred-flush timer fires. Debug mode sends each event on
//! its own to the `/debug` endpoint.

mod args;
pub mod client;
pub mod emitter;
pub mod envelope;
pub mod error;
pub mod hook;
pub mod options;
pub mod submitter;

pub use client::{AnalyticsClient, AnalyticsClientBuilder, SIGNUP_EVENT};
pub use emitter::{BufferedEmitter, EmitterConfig, EmitterPhase};
pub use envelope::{EnvelopeBuilder, RawEvent, SDK_NAME, SDK_VERSION};
pub use error::{AnalyticsError, ConfigError, Result};
pub use hook::{FlushObserver, FlushTrigger, NoOpFlushObserver, SharedFlushObserver};
pub use options::{
	AnalyticsOptions, AnalyticsOptionsLayer, EnvSource, Mode, OptionsSource, TomlSource, ENV_PREFIX,
};
pub use submitter::{debug_url, HttpSubmitter, Submitter, DEBUG_PATH};

pub use beacon_analytics_core::{
	CallSite, DateZone, Envelope, EventType, Properties, PropertyValue, ValidationError,
};
