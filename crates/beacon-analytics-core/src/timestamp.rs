// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event time resolution and date formatting.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::properties::Properties;
use crate::value::PropertyValue;

/// Property key carrying an explicit event time.
pub const TIME_KEY: &str = "$time";

/// Format used when a date property is coerced to a string.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Time zone used when rendering date properties and parsing zone-less
/// `$time` strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateZone {
	#[default]
	Utc,
	Local,
}

/// Formats a date as `YYYY-MM-DD HH:mm:ss.SSS` in the given zone.
pub fn format_datetime(dt: &DateTime<Utc>, zone: DateZone) -> String {
	match zone {
		DateZone::Utc => dt.format(DATE_FORMAT).to_string(),
		DateZone::Local => dt.with_timezone(&Local).format(DATE_FORMAT).to_string(),
	}
}

/// Resolves a `$time` value to milliseconds since the Unix epoch.
///
/// `Null`, zero and a blank string count as unset and resolve to `now`.
pub fn resolve_timestamp(
	value: &PropertyValue,
	now: DateTime<Utc>,
	zone: DateZone,
) -> Result<i64, ValidationError> {
	if is_unset(value) {
		return Ok(now.timestamp_millis());
	}

	match value {
		PropertyValue::Number(n) => n
			.as_i64()
			.or_else(|| n.as_f64().map(|f| f.trunc() as i64))
			.ok_or_else(|| invalid(n.to_string())),
		PropertyValue::String(s) => parse_time_string(s, zone).ok_or_else(|| invalid(s.clone())),
		PropertyValue::DateTime(dt) => Ok(dt.timestamp_millis()),
		other => Err(invalid(other.kind().to_string())),
	}
}

/// Removes `$time` from the bag and returns the event time.
///
/// Falls back to `now` when the bag carries no `$time`. The key is removed
/// even when its value turns out to be invalid.
pub fn extract_timestamp(
	properties: &mut Properties,
	now: DateTime<Utc>,
	zone: DateZone,
) -> Result<i64, ValidationError> {
	match properties.remove(TIME_KEY) {
		Some(value) => resolve_timestamp(&value, now, zone),
		None => Ok(now.timestamp_millis()),
	}
}

fn is_unset(value: &PropertyValue) -> bool {
	match value {
		PropertyValue::Null => true,
		PropertyValue::Number(n) => n.as_f64() == Some(0.0),
		PropertyValue::String(s) => s.trim().is_empty(),
		_ => false,
	}
}

fn parse_time_string(s: &str, zone: DateZone) -> Option<i64> {
	let s = s.trim();

	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.timestamp_millis());
	}

	for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
		if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
			return localize(naive, zone);
		}
	}

	NaiveDate::parse_from_str(s, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
}

fn localize(naive: NaiveDateTime, zone: DateZone) -> Option<i64> {
	match zone {
		DateZone::Utc => Some(Utc.from_utc_datetime(&naive).timestamp_millis()),
		DateZone::Local => Local
			.from_local_datetime(&naive)
			.earliest()
			.map(|dt| dt.timestamp_millis()),
	}
}

fn invalid(value: String) -> ValidationError {
	ValidationError::InvalidTimestamp { value }
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::FixedOffset;

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
	}

	#[test]
	fn test_extract_timestamp_from_rfc3339_string() {
		let mut props = Properties::new().insert(TIME_KEY, "2016-07-29T00:00:00+08:00");
		let time = extract_timestamp(&mut props, now(), DateZone::Utc).unwrap();

		assert_eq!(time, 1469721600000);
		assert!(props.get(TIME_KEY).is_none());
	}

	#[test]
	fn test_extract_timestamp_defaults_to_now() {
		let mut props = Properties::new().insert("other", 1);
		let time = extract_timestamp(&mut props, now(), DateZone::Utc).unwrap();
		assert_eq!(time, now().timestamp_millis());
		assert_eq!(props.len(), 1);
	}

	#[test]
	fn test_resolve_native_date() {
		let offset = FixedOffset::east_opt(8 * 3600).unwrap();
		let dt = offset.with_ymd_and_hms(2015, 1, 28, 0, 0, 0).unwrap();
		let time = resolve_timestamp(&PropertyValue::from(dt), now(), DateZone::Utc).unwrap();
		assert_eq!(time, 1422374400000);
	}

	#[test]
	fn test_resolve_number_passes_through() {
		let time =
			resolve_timestamp(&PropertyValue::from(1422374400000i64), now(), DateZone::Utc).unwrap();
		assert_eq!(time, 1422374400000);

		let time = resolve_timestamp(&PropertyValue::from(1422374400000.9), now(), DateZone::Utc)
			.unwrap();
		assert_eq!(time, 1422374400000);
	}

	#[test]
	fn test_resolve_unset_values_are_now() {
		for value in [
			PropertyValue::Null,
			PropertyValue::from(0),
			PropertyValue::from(0.0),
			PropertyValue::from(""),
			PropertyValue::from("  "),
		] {
			let time = resolve_timestamp(&value, now(), DateZone::Utc).unwrap();
			assert_eq!(time, now().timestamp_millis(), "{value:?}");
		}
	}

	#[test]
	fn test_resolve_zoneless_string_uses_zone() {
		let time = resolve_timestamp(
			&PropertyValue::from("2015-01-27 16:00:00.000"),
			now(),
			DateZone::Utc,
		)
		.unwrap();
		assert_eq!(time, 1422374400000);

		let time =
			resolve_timestamp(&PropertyValue::from("2015-01-27"), now(), DateZone::Utc).unwrap();
		assert_eq!(time, 1422316800000);
	}

	#[test]
	fn test_resolve_rejects_garbage() {
		let err = resolve_timestamp(&PropertyValue::from("yesterday"), now(), DateZone::Utc)
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));

		let err = resolve_timestamp(&PropertyValue::from(true), now(), DateZone::Utc).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidTimestamp { .. }));
	}

	#[test]
	fn test_format_datetime_millisecond_precision() {
		let dt = Utc.timestamp_millis_opt(1422374400123).unwrap();
		assert_eq!(format_datetime(&dt, DateZone::Utc), "2015-01-27 16:00:00.123");
	}
}
