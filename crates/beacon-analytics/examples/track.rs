// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracks a few events against the endpoint configured in the environment.
//!
//! ```text
//! BEACON_ANALYTICS_SERVER_URL=https://ingest.example.com/sa?project=default \
//! BEACON_ANALYTICS_DRY_RUN=true \
//! RUST_LOG=beacon_analytics=debug \
//!     cargo run -p beacon-analytics --example track
//! ```

use std::path::Path;

use beacon_analytics::{AnalyticsClient, AnalyticsOptions, Properties};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let options = AnalyticsOptions::load(Some(Path::new("beacon-analytics.toml")))?;
	let client = AnalyticsClient::builder().options(options).build()?;

	client
		.register_super_properties(
			Properties::new()
				.insert("$appVersion", env!("CARGO_PKG_VERSION"))
				.insert("platform", std::env::consts::OS),
		)
		.await?;

	client
		.track_signup("user-123", "anonymous-42", Properties::new().insert("channel", "demo"))
		.await?;

	for (i, product) in ["keyboard", "mouse", "monitor"].into_iter().enumerate() {
		client
			.track(
				"user-123",
				"ViewProduct",
				Properties::new()
					.insert("productName", product)
					.insert("position", i)
					.insert("viewedAt", chrono::Utc::now()),
			)
			.await?;
	}

	client
		.profile_set_once("user-123", Properties::new().insert("firstSeen", chrono::Utc::now()))
		.await?;

	client.close().await?;
	Ok(())
}
