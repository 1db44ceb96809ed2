// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source location of the application code that issued a tracking call.

use std::panic::Location;

/// Value of `$lib_method` for calls annotated from code.
pub const CODE_METHOD: &str = "code";

/// Caller annotation merged into an envelope's `lib` bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
	/// Always `"code"` for server-side tracking.
	pub method: String,
	/// `module##function##file##line,column`; unknown parts are empty.
	pub detail: String,
}

impl CallSite {
	/// Captures the location of the nearest caller not marked
	/// `#[track_caller]`.
	#[track_caller]
	pub fn capture() -> Self {
		Self::from_location(Location::caller())
	}

	pub fn from_location(location: &Location<'_>) -> Self {
		Self::new("", "", location.file(), location.line(), location.column())
	}

	pub fn new(module: &str, function: &str, file: &str, line: u32, column: u32) -> Self {
		Self {
			method: CODE_METHOD.to_string(),
			detail: format!("{module}##{function}##{file}##{line},{column}"),
		}
	}
}
