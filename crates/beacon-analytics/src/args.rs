// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-method argument checks.
//!
//! Each public tracking method declares which of its arguments must be
//! present, which must be valid key names and which are property bags. The
//! checks run before anything is merged or buffered.

use beacon_analytics_core::{
	check_event_name, check_key_exists, check_property_keys, Properties, ValidationError,
};

/// How an argument is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
	/// Non-empty string of at most 255 characters.
	Required,
	/// Valid event name; reserved words are matched as sent.
	EventName,
	/// Every key except `$time` must be a valid key name.
	Properties,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ArgRule {
	pub name: &'static str,
	pub rule: Rule,
}

const fn arg(name: &'static str, rule: Rule) -> ArgRule {
	ArgRule { name, rule }
}

pub(crate) const TRACK: &[ArgRule] = &[
	arg("distinct_id", Rule::Required),
	arg("event", Rule::EventName),
	arg("properties", Rule::Properties),
];

pub(crate) const TRACK_SIGNUP: &[ArgRule] = &[
	arg("distinct_id", Rule::Required),
	arg("original_id", Rule::Required),
	arg("properties", Rule::Properties),
];

pub(crate) const PROFILE_SET: &[ArgRule] = &[
	arg("distinct_id", Rule::Required),
	arg("properties", Rule::Properties),
];

pub(crate) const PROFILE_SET_ONCE: &[ArgRule] = PROFILE_SET;

/// An argument value as seen by the checks.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ArgValue<'a> {
	Str(&'a str),
	Properties(&'a Properties),
}

impl<'a> From<&'a str> for ArgValue<'a> {
	fn from(value: &'a str) -> Self {
		ArgValue::Str(value)
	}
}

impl<'a> From<&'a String> for ArgValue<'a> {
	fn from(value: &'a String) -> Self {
		ArgValue::Str(value)
	}
}

impl<'a> From<&'a Properties> for ArgValue<'a> {
	fn from(value: &'a Properties) -> Self {
		ArgValue::Properties(value)
	}
}

/// Applies `rules` to `values` positionally, failing on the first violation.
///
/// `snake_case_event_names` tells the event-name rule whether the name will
/// be snake-cased before it is sent.
pub(crate) fn validate_args(
	rules: &[ArgRule],
	values: &[ArgValue<'_>],
	snake_case_event_names: bool,
) -> Result<(), ValidationError> {
	debug_assert_eq!(rules.len(), values.len());

	for (ArgRule { name, rule }, value) in rules.iter().zip(values) {
		match (rule, value) {
			(Rule::Required, ArgValue::Str(s)) => {
				check_key_exists(Some(*s), name)?;
			}
			(Rule::EventName, ArgValue::Str(s)) => {
				check_event_name(s, name, snake_case_event_names)?;
			}
			(Rule::Properties, ArgValue::Properties(bag)) => {
				check_property_keys(bag)?;
			}
			(Rule::Required | Rule::EventName, ArgValue::Properties(_)) => {
				return Err(ValidationError::NotAString {
					name: name.to_string(),
				});
			}
			(Rule::Properties, ArgValue::Str(_)) => {
				return Err(ValidationError::InvalidPropertyType {
					key: name.to_string(),
					kind: "string",
				});
			}
		}
	}
	Ok(())
}
