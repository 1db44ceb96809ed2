// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch transport.
//!
//! The emitter only relies on the [`Submitter`] contract: one call per
//! batch, all or nothing, a single error on failure. [`HttpSubmitter`] is
//! the production implementation: the batch is serialized as a JSON array,
//! optionally gzipped, base64 encoded and posted as a form body
//! `data_list=<base64>&gzip=<0|1>`.

use std::io::Write;

use base64::Engine;
use beacon_analytics_core::Envelope;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AnalyticsError, Result};
use crate::options::AnalyticsOptions;

/// Path that replaces the configured one in debug mode.
pub const DEBUG_PATH: &str = "/debug";

/// Handler for sending batched envelopes to the server.
#[async_trait::async_trait]
pub trait Submitter: Send + Sync {
	/// Send a batch of envelopes. Either the whole batch is accepted or an
	/// error is returned.
	async fn submit(&self, batch: Vec<Envelope>) -> Result<()>;
}

/// Returns `url` with its path replaced by `/debug`.
pub fn debug_url(url: &Url) -> Url {
	let mut debug = url.clone();
	debug.set_path(DEBUG_PATH);
	debug
}

/// Posts batches to an ingestion endpoint over HTTP.
pub struct HttpSubmitter {
	url: Url,
	http_client: Client,
	gzip: bool,
	dry_run: bool,
	debug: bool,
}

impl HttpSubmitter {
	/// Creates a submitter for `server_url`. In debug mode the request path
	/// is replaced by `/debug`.
	pub fn new(server_url: &str, options: &AnalyticsOptions) -> Result<Self> {
		let url = Url::parse(server_url)
			.map_err(|e| AnalyticsError::InvalidServerUrl(format!("{server_url}: {e}")))?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(AnalyticsError::InvalidServerUrl(format!(
				"{server_url}: unsupported scheme"
			)));
		}

		let debug = options.is_debug();
		let url = if debug { debug_url(&url) } else { url };

		let http_client = beacon_common_http::builder()
			.timeout(options.timeout)
			.build()
			.map_err(AnalyticsError::RequestFailed)?;

		Ok(Self {
			url,
			http_client,
			gzip: options.gzip,
			dry_run: options.dry_run,
			debug,
		})
	}

	/// The URL batches are posted to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Encodes a batch into the `data_list` form value.
	pub fn encode_batch(&self, batch: &[Envelope]) -> Result<String> {
		let json = serde_json::to_vec(batch)?;
		let payload = if self.gzip {
			let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
			encoder.write_all(&json)?;
			encoder.finish()?
		} else {
			json
		};
		Ok(base64::engine::general_purpose::STANDARD.encode(payload))
	}
}

#[async_trait::async_trait]
impl Submitter for HttpSubmitter {
	async fn submit(&self, batch: Vec<Envelope>) -> Result<()> {
		let size = batch.len();
		let data_list = self.encode_batch(&batch)?;
		let gzip_flag = if self.gzip { "1" } else { "0" };

		debug!(url = %self.url, count = size, gzip = self.gzip, "Posting event batch");

		let mut request = self
			.http_client
			.post(self.url.clone())
			.form(&[("data_list", data_list.as_str()), ("gzip", gzip_flag)]);
		if self.dry_run {
			request = request.header("Dry-Run", "true");
		}

		let response = request.send().await?;
		let status = response.status();

		if status.as_u16() < 300 {
			debug!(status = status.as_u16(), count = size, "Event batch accepted");
			return Ok(());
		}

		if self.debug && size > 1 && status == StatusCode::BAD_REQUEST {
			warn!(count = size, "Batch mode is not supported in debug mode");
			return Err(AnalyticsError::DebugBatchRejected { size });
		}

		let message = response.text().await.unwrap_or_default();
		Err(AnalyticsError::ServerError {
			status: status.as_u16(),
			message,
		})
	}
}
