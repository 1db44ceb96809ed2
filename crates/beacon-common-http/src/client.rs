// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = detect_platform();

const fn detect_platform() -> &'static str {
	// std::env::consts cannot be concatenated in a const context, so the
	// common targets are spelled out.
	if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
		"linux-x86_64"
	} else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
		"linux-aarch64"
	} else if cfg!(all(target_os = "macos", target_arch = "x86_64")) {
		"macos-x86_64"
	} else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
		"macos-aarch64"
	} else if cfg!(all(target_os = "windows", target_arch = "x86_64")) {
		"windows-x86_64"
	} else {
		"unknown"
	}
}

/// Creates a new HTTP client builder with the standard Beacon User-Agent header.
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = beacon_common_http::builder()
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard Beacon User-Agent string.
///
/// Format: `beacon/{platform}/{version}`
pub fn user_agent() -> String {
	format!("beacon/{}/{}", PLATFORM, env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("beacon/"));
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "beacon");
		assert_eq!(parts[1], PLATFORM);
		assert_eq!(parts[2], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn default_builder_builds() {
		assert!(builder().build().is_ok());
	}
}
