// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key and value checks applied before an event is accepted.
//!
//! Keys must match `^[A-Za-z_$][A-Za-z0-9_$]{0,99}$` and, once a leading `$`
//! is removed and the remainder snake-cased, must not be one of
//! [`RESERVED_WORDS`]. Values must be numbers, strings, booleans, arrays or
//! dates; dates are rewritten in place to their string form.

use crate::error::ValidationError;
use crate::normalize::{snake_case, RESERVED_PREFIX};
use crate::properties::Properties;
use crate::timestamp::{format_datetime, DateZone, TIME_KEY};
use crate::value::PropertyValue;

/// Maximum length of a required string argument.
pub const MAX_VALUE_LENGTH: usize = 255;

/// Maximum length of a property key or event name.
pub const MAX_KEY_LENGTH: usize = 100;

/// Names used by the ingestion schema itself.
pub const RESERVED_WORDS: &[&str] = &[
	"distinct_id",
	"original_id",
	"time",
	"properties",
	"id",
	"first_id",
	"second_id",
	"users",
	"events",
	"event",
	"user_id",
	"date",
	"datetime",
];

/// Checks that a value is present, non-empty and at most 255 characters.
pub fn check_key_exists<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ValidationError> {
	let value = value.ok_or_else(|| ValidationError::NotAString {
		name: name.to_string(),
	})?;

	if value.is_empty() {
		return Err(ValidationError::EmptyKey {
			name: name.to_string(),
		});
	}

	if value.chars().count() > MAX_VALUE_LENGTH {
		return Err(ValidationError::TooLong {
			name: name.to_string(),
		});
	}

	Ok(value)
}

/// Checks that a value is usable as a property key or event name.
pub fn check_key_pattern<'a>(value: &'a str, name: &str) -> Result<&'a str, ValidationError> {
	check_key_exists(Some(value), name)?;

	if !matches_key_pattern(value) || is_reserved(value) {
		return Err(ValidationError::InvalidKey {
			name: name.to_string(),
		});
	}

	Ok(value)
}

/// Checks that a value is usable as an event name.
///
/// Event names are sent as given unless `snake_cased` is set, so the
/// reserved-word test compares the name with its leading `$` removed and is
/// only snake-cased when the name will be.
pub fn check_event_name<'a>(
	value: &'a str,
	name: &str,
	snake_cased: bool,
) -> Result<&'a str, ValidationError> {
	check_key_exists(Some(value), name)?;

	let reserved = if snake_cased {
		is_reserved(value)
	} else {
		let stripped = value.strip_prefix(RESERVED_PREFIX).unwrap_or(value);
		RESERVED_WORDS.contains(&stripped)
	};
	if !matches_key_pattern(value) || reserved {
		return Err(ValidationError::InvalidKey {
			name: name.to_string(),
		});
	}

	Ok(value)
}

/// Checks the type of `bag[key]`, coercing a date to its string form.
///
/// `$time` accepts numbers, strings, dates and `Null` (unset) and is left
/// untouched. A missing key passes.
pub fn check_value_type(
	bag: &mut Properties,
	key: &str,
	zone: DateZone,
) -> Result<(), ValidationError> {
	let Some(value) = bag.get_mut(key) else {
		return Ok(());
	};

	if key == TIME_KEY {
		return match value {
			PropertyValue::Null
			| PropertyValue::Number(_)
			| PropertyValue::String(_)
			| PropertyValue::DateTime(_) => Ok(()),
			other => Err(invalid_type(key, other)),
		};
	}

	match value {
		PropertyValue::Bool(_)
		| PropertyValue::Number(_)
		| PropertyValue::String(_)
		| PropertyValue::Array(_) => Ok(()),
		PropertyValue::DateTime(dt) => {
			let formatted = format_datetime(dt, zone);
			*value = PropertyValue::String(formatted);
			Ok(())
		}
		other => Err(invalid_type(key, other)),
	}
}

/// Runs the key-pattern check over every key except `$time`.
pub fn check_property_keys(bag: &Properties) -> Result<(), ValidationError> {
	for (key, _) in bag {
		if key != TIME_KEY {
			check_key_pattern(key, key)?;
		}
	}
	Ok(())
}

/// Runs the key-pattern and value-type checks over a whole bag.
///
/// Fails on the first offending key. Dates already visited are coerced even
/// when a later key fails, so callers validate a copy when the original
/// must stay untouched on error.
pub fn check_properties(bag: &mut Properties, zone: DateZone) -> Result<(), ValidationError> {
	check_property_keys(bag)?;
	for key in bag.keys() {
		check_value_type(bag, &key, zone)?;
	}
	Ok(())
}

fn matches_key_pattern(value: &str) -> bool {
	let mut chars = value.chars();
	let Some(first) = chars.next() else {
		return false;
	};

	let valid_first = first.is_ascii_alphabetic() || first == '_' || first == RESERVED_PREFIX;
	valid_first
		&& value.len() <= MAX_KEY_LENGTH
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == RESERVED_PREFIX)
}

fn is_reserved(value: &str) -> bool {
	let stripped = value.strip_prefix(RESERVED_PREFIX).unwrap_or(value);
	let normalized = snake_case(stripped);
	RESERVED_WORDS.contains(&normalized.as_str())
}

fn invalid_type(key: &str, value: &PropertyValue) -> ValidationError {
	ValidationError::InvalidPropertyType {
		key: key.to_string(),
		kind: value.kind(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use proptest::prelude::*;

	#[test]
	fn test_check_key_exists() {
		assert_eq!(check_key_exists(Some("user-1"), "distinct_id"), Ok("user-1"));
		assert!(matches!(
			check_key_exists(Some(""), "distinct_id"),
			Err(ValidationError::EmptyKey { .. })
		));
		assert!(matches!(
			check_key_exists(None, "original_id"),
			Err(ValidationError::NotAString { .. })
		));

		let long = "x".repeat(256);
		assert!(matches!(
			check_key_exists(Some(&long), "distinct_id"),
			Err(ValidationError::TooLong { .. })
		));
		let max = "x".repeat(255);
		assert!(check_key_exists(Some(&max), "distinct_id").is_ok());
	}

	#[test]
	fn test_check_key_pattern_accepts_valid_keys() {
		for key in ["a", "_private", "$os", "superMan", "page_view2", "$app_version"] {
			assert!(check_key_pattern(key, key).is_ok(), "{key} should be valid");
		}
	}

	#[test]
	fn test_check_key_pattern_rejects_bad_shapes() {
		for key in ["1abc", "has space", "dash-ed", "ünicode"] {
			assert!(
				matches!(check_key_pattern(key, key), Err(ValidationError::InvalidKey { .. })),
				"{key} should be invalid"
			);
		}
		let too_long = "a".repeat(101);
		assert!(check_key_pattern(&too_long, "key").is_err());
		assert!(check_key_pattern(&"a".repeat(100), "key").is_ok());
	}

	#[test]
	fn test_check_key_pattern_rejects_reserved_words() {
		for key in ["distinct_id", "time", "$time", "event", "distinctId", "$userId", "Date"] {
			assert!(
				matches!(check_key_pattern(key, key), Err(ValidationError::InvalidKey { .. })),
				"{key} should be reserved"
			);
		}
		assert!(check_key_pattern("timestamp", "key").is_ok());
		assert!(check_key_pattern("event_name", "key").is_ok());
	}

	#[test]
	fn test_check_event_name_matches_reserved_words_exactly() {
		for event in ["Event", "Date", "UserId", "Users", "$Time"] {
			assert!(check_event_name(event, "event", false).is_ok(), "{event} should be valid");
		}
		for event in ["event", "$date", "user_id", "users"] {
			assert!(
				matches!(
					check_event_name(event, "event", false),
					Err(ValidationError::InvalidKey { ref name }) if name == "event"
				),
				"{event} should be reserved"
			);
		}
		assert!(check_event_name("page view", "event", false).is_err());
		assert!(check_event_name("", "event", false).is_err());
	}

	#[test]
	fn test_check_event_name_snake_cased() {
		assert!(check_event_name("UserId", "event", true).is_err());
		assert!(check_event_name("Event", "event", true).is_err());
		assert!(check_event_name("ViewProduct", "event", true).is_ok());
	}

	#[test]
	fn test_check_value_type_accepts_scalars_and_arrays() {
		let mut bag = Properties::new()
			.insert("n", 1)
			.insert("s", "x")
			.insert("b", false)
			.insert("a", vec!["x", "y"]);
		for key in bag.keys() {
			assert!(check_value_type(&mut bag, &key, DateZone::Utc).is_ok());
		}
	}

	#[test]
	fn test_check_value_type_coerces_dates() {
		let dt = Utc.with_ymd_and_hms(2015, 1, 27, 16, 0, 0).unwrap();
		let mut bag = Properties::new().insert("signed_up_at", dt);

		check_value_type(&mut bag, "signed_up_at", DateZone::Utc).unwrap();

		assert_eq!(
			bag.get("signed_up_at"),
			Some(&PropertyValue::from("2015-01-27 16:00:00.000"))
		);
	}

	#[test]
	fn test_check_value_type_rejects_objects_and_null() {
		let mut bag = Properties::new()
			.insert("nested", serde_json::json!({"a": 1}))
			.insert("nothing", PropertyValue::Null);

		assert!(matches!(
			check_value_type(&mut bag, "nested", DateZone::Utc),
			Err(ValidationError::InvalidPropertyType { kind: "object", .. })
		));
		assert!(matches!(
			check_value_type(&mut bag, "nothing", DateZone::Utc),
			Err(ValidationError::InvalidPropertyType { kind: "null", .. })
		));
	}

	#[test]
	fn test_check_value_type_time_key() {
		let dt = Utc.with_ymd_and_hms(2015, 1, 27, 16, 0, 0).unwrap();
		let mut bag = Properties::new().insert(TIME_KEY, dt);
		check_value_type(&mut bag, TIME_KEY, DateZone::Utc).unwrap();
		assert!(matches!(bag.get(TIME_KEY), Some(PropertyValue::DateTime(_))));

		let mut bag = Properties::new().insert(TIME_KEY, true);
		assert!(check_value_type(&mut bag, TIME_KEY, DateZone::Utc).is_err());

		let mut bag = Properties::new().insert(TIME_KEY, PropertyValue::Null);
		assert!(check_value_type(&mut bag, TIME_KEY, DateZone::Utc).is_ok());

		let mut bag = Properties::new().insert(TIME_KEY, vec![1, 2]);
		assert!(check_value_type(&mut bag, TIME_KEY, DateZone::Utc).is_err());
	}

	#[test]
	fn test_check_properties_skips_time_key_pattern() {
		let mut bag = Properties::new()
			.insert(TIME_KEY, 1422374400000i64)
			.insert("plan", "pro");
		assert!(check_properties(&mut bag, DateZone::Utc).is_ok());
	}

	#[test]
	fn test_check_properties_fails_fast() {
		let mut bag = Properties::new()
			.insert("ok", 1)
			.insert("bad key", 2);
		assert!(matches!(
			check_properties(&mut bag, DateZone::Utc),
			Err(ValidationError::InvalidKey { .. })
		));
	}

	proptest! {
		#[test]
		fn generated_valid_keys_pass(key in "[a-z][a-z0-9]{2,20}_[a-z]{3,10}") {
			prop_assert!(check_key_pattern(&key, "key").is_ok());
		}

		#[test]
		fn keys_with_forbidden_chars_fail(prefix in "[a-z]{1,10}", bad in "[-. /#]", suffix in "[a-z]{0,10}") {
			let key = format!("{prefix}{bad}{suffix}");
			prop_assert!(check_key_pattern(&key, "key").is_err());
		}
	}
}
