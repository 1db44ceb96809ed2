// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation errors raised before an event reaches the buffer.

use thiserror::Error;

/// A property key, argument or value failed validation.
///
/// Validation errors are raised synchronously to the caller of a tracking
/// method. They are never buffered and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// A required value was empty.
	#[error("{name} is empty")]
	EmptyKey { name: String },

	/// A value exceeded the maximum length of 255 characters.
	#[error("{name} is too long")]
	TooLong { name: String },

	/// A required value was absent or not a string.
	#[error("{name} must be a string")]
	NotAString { name: String },

	/// A key did not match the naming rules or collided with a reserved word.
	#[error("{name} is invalid")]
	InvalidKey { name: String },

	/// A property value has a type that cannot be sent.
	#[error("property {key} is invalid: {kind} values are not allowed")]
	InvalidPropertyType { key: String, kind: &'static str },

	/// The `$time` property could not be interpreted as a point in time.
	#[error("invalid timestamp: {value}")]
	InvalidTimestamp { value: String },
}

impl ValidationError {
	/// Returns the key or argument name the error refers to.
	pub fn subject(&self) -> &str {
		match self {
			ValidationError::EmptyKey { name }
			| ValidationError::TooLong { name }
			| ValidationError::NotAString { name }
			| ValidationError::InvalidKey { name } => name,
			ValidationError::InvalidPropertyType { key, .. } => key,
			ValidationError::InvalidTimestamp { .. } => crate::timestamp::TIME_KEY,
		}
	}
}
