// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.

use std::path::PathBuf;

use beacon_analytics_core::ValidationError;
use thiserror::Error;

/// Analytics SDK errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// A tracking call was rejected before reaching the buffer.
	#[error("event validation failed: {0}")]
	Validation(#[from] ValidationError),

	/// Server URL is missing or cannot be parsed.
	#[error("invalid server URL: {0}")]
	InvalidServerUrl(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// The debug endpoint only accepts one event per request.
	#[error("batch of {size} events rejected: batch mode is not supported in debug mode")]
	DebugBatchRejected { size: usize },

	/// Serialization error.
	#[error("serialization error: {0}")]
	SerializationError(#[from] serde_json::Error),

	/// Compressing the request body failed.
	#[error("compression error: {0}")]
	CompressionError(#[from] std::io::Error),

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// The final drain failed; reported to `close` calls that did not run it.
	#[error("close failed: {0}")]
	CloseFailed(String),

	/// The delivery task ended before answering a flush.
	#[error("delivery task stopped before the batch was submitted")]
	DeliveryStopped,

	/// Options could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl AnalyticsError {
	/// True for errors raised synchronously by argument or property checks.
	pub fn is_validation(&self) -> bool {
		matches!(self, AnalyticsError::Validation(_))
	}

	/// True for errors produced while handing a batch to the transport.
	pub fn is_submission(&self) -> bool {
		matches!(
			self,
			AnalyticsError::RequestFailed(_)
				| AnalyticsError::ServerError { .. }
				| AnalyticsError::DebugBatchRejected { .. }
				| AnalyticsError::SerializationError(_)
				| AnalyticsError::CompressionError(_)
				| AnalyticsError::CloseFailed(_)
				| AnalyticsError::DeliveryStopped
		)
	}

	/// Whether a transport-level retry could succeed.
	///
	/// The SDK itself never retries; this is informational for applications
	/// observing flush failures.
	pub fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
			AnalyticsError::ServerError { status, .. } => {
				matches!(*status, 429 | 408 | 500 | 502 | 503 | 504)
			}
			_ => false,
		}
	}
}

/// Errors raised while loading [`AnalyticsOptions`](crate::AnalyticsOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validation_classification() {
		let err = AnalyticsError::from(ValidationError::EmptyKey {
			name: "distinct_id".to_string(),
		});
		assert!(err.is_validation());
		assert!(!err.is_submission());
		assert!(!err.is_retryable());
		assert_eq!(err.to_string(), "event validation failed: distinct_id is empty");
	}

	#[test]
	fn test_submission_classification() {
		let err = AnalyticsError::DebugBatchRejected { size: 3 };
		assert!(err.is_submission());
		assert!(!err.is_validation());
		assert!(!err.is_retryable());

		let err = AnalyticsError::CloseFailed("server error (500): boom".to_string());
		assert!(err.is_submission());
		assert_eq!(err.to_string(), "close failed: server error (500): boom");
	}

	#[test]
	fn test_server_error_retryable_statuses() {
		for status in [429, 408, 500, 502, 503, 504] {
			let err = AnalyticsError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(err.is_retryable(), "status {status} should be retryable");
		}
	}

	#[test]
	fn test_server_error_non_retryable_statuses() {
		for status in [400, 401, 403, 404, 422] {
			let err = AnalyticsError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(!err.is_retryable(), "status {status} should not be retryable");
		}
	}

	#[test]
	fn test_client_shutdown_is_neither() {
		let err = AnalyticsError::ClientShutdown;
		assert!(!err.is_validation());
		assert!(!err.is_submission());
	}
}
