// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assembly of envelopes from raw tracking calls.

use beacon_analytics_core::{
	check_properties, check_value_type, extract_timestamp, format_datetime, normalize_json_keys,
	normalize_keys, snake_case, CallSite, DateZone, Envelope, EventType, Properties, PropertyValue, ValidationError,
	RESERVED_PREFIX, TIME_KEY,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::trace;

/// Value of the `$lib` identity property.
pub const SDK_NAME: &str = "Rust";
/// Value of the `$lib_version` identity property.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keys consulted for `$app_version`, in precedence order within one bag.
const APP_VERSION_KEYS: [&str; 4] = ["$app_version", "$appVersion", "appVersion", "app_version"];

/// A tracking call before validation and normalization.
#[derive(Debug, Clone)]
pub struct RawEvent {
	pub event_type: EventType,
	pub event: Option<String>,
	pub distinct_id: String,
	pub original_id: Option<String>,
	pub properties: Properties,
	pub call_site: Option<CallSite>,
}

/// Builds envelopes: merges, validates, extracts `$time`, normalizes.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
	date_zone: DateZone,
	snake_case_event_names: bool,
}

impl EnvelopeBuilder {
	pub fn new(date_zone: DateZone) -> Self {
		Self {
			date_zone,
			snake_case_event_names: false,
		}
	}

	/// Also snake-case the event name of `track` calls.
	pub fn with_snake_case_event_names(mut self, enabled: bool) -> Self {
		self.snake_case_event_names = enabled;
		self
	}

	/// Identity properties merged under every event.
	pub fn sdk_properties() -> Properties {
		Properties::new()
			.insert("$lib", SDK_NAME)
			.insert("$lib_version", SDK_VERSION)
	}

	/// Builds an envelope stamped with the current time unless `$time` is set.
	pub fn build(
		&self,
		raw: RawEvent,
		super_properties: &Properties,
	) -> Result<Envelope, ValidationError> {
		self.build_at(raw, super_properties, Utc::now())
	}

	/// Builds an envelope using `now` as the default event time.
	///
	/// Any validation failure aborts the build; nothing partial is returned.
	pub fn build_at(
		&self,
		raw: RawEvent,
		super_properties: &Properties,
		now: DateTime<Utc>,
	) -> Result<Envelope, ValidationError> {
		let RawEvent {
			event_type,
			event,
			distinct_id,
			original_id,
			properties: call_properties,
			call_site,
		} = raw;

		let lib = self.lib_properties(super_properties, &call_properties, call_site);

		let mut properties = Self::sdk_properties()
			.merge(super_properties.clone())
			.merge(call_properties);

		if event_type.is_profile() {
			properties.retain(|key, _| !is_app_version_key(key));
		}

		check_value_type(&mut properties, TIME_KEY, self.date_zone)?;
		let time = extract_timestamp(&mut properties, now, self.date_zone)?;

		check_properties(&mut properties, self.date_zone)?;

		let properties = normalize_keys(properties).into_json_map();
		let event = match event {
			Some(name) if self.snake_case_event_names && event_type == EventType::Track => {
				Some(snake_case(&name))
			}
			other => other,
		};

		trace!(%event_type, time, "envelope built");

		Ok(Envelope::new(
			event_type,
			event,
			time,
			distinct_id,
			original_id,
			properties,
			lib,
		))
	}

	fn lib_properties(
		&self,
		super_properties: &Properties,
		call_properties: &Properties,
		call_site: Option<CallSite>,
	) -> Map<String, Value> {
		let mut lib = Self::sdk_properties();
		if let Some(site) = call_site {
			lib.set("$lib_method", site.method);
			lib.set("$lib_detail", site.detail);
		}
		if let Some(version) = resolve_app_version(super_properties, call_properties) {
			let version = match version {
				PropertyValue::DateTime(dt) => {
					PropertyValue::String(format_datetime(&dt, self.date_zone))
				}
				other => other,
			};
			lib.set("$app_version", version);
		}
		normalize_json_keys(lib.into_json_map())
	}
}

/// First non-blank app version: super properties before call properties.
fn resolve_app_version(
	super_properties: &Properties,
	call_properties: &Properties,
) -> Option<PropertyValue> {
	[super_properties, call_properties]
		.into_iter()
		.flat_map(|bag| APP_VERSION_KEYS.iter().filter_map(move |key| bag.get(key)))
		.find(|value| !value.is_blank())
		.cloned()
}

fn is_app_version_key(key: &str) -> bool {
	let stripped = key.strip_prefix(RESERVED_PREFIX).unwrap_or(key);
	snake_case(stripped) == "app_version"
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
	}

	fn raw(event_type: EventType, properties: Properties) -> RawEvent {
		RawEvent {
			event_type,
			event: (event_type == EventType::Track).then(|| "page_view".to_string()),
			distinct_id: "user-id".to_string(),
			original_id: None,
			properties,
			call_site: None,
		}
	}

	#[test]
	fn test_merge_order_call_overrides_super_overrides_sdk() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let supers = Properties::new()
			.insert("plan", "free")
			.insert("region", "eu")
			.insert("$lib", "Overridden");
		let call = Properties::new().insert("plan", "pro");

		let envelope = builder
			.build_at(raw(EventType::Track, call), &supers, now())
			.unwrap();

		let props = envelope.properties();
		assert_eq!(props["plan"], "pro");
		assert_eq!(props["region"], "eu");
		assert_eq!(props["$lib"], "Overridden");
		assert_eq!(props["$lib_version"], SDK_VERSION);
	}

	#[test]
	fn test_time_property_becomes_envelope_time() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let call = Properties::new().insert("$time", "2016-07-29T00:00:00+08:00");

		let envelope = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap();

		assert_eq!(envelope.time(), 1469721600000);
		assert!(!envelope.properties().contains_key("$time"));
	}

	#[test]
	fn test_time_defaults_to_now() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let envelope = builder
			.build_at(raw(EventType::Track, Properties::new()), &Properties::new(), now())
			.unwrap();
		assert_eq!(envelope.time(), now().timestamp_millis());
	}

	#[test]
	fn test_unset_time_values_default_to_now() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		for value in [PropertyValue::from(0), PropertyValue::from(""), PropertyValue::Null] {
			let call = Properties::new().insert("$time", value.clone());
			let envelope = builder
				.build_at(raw(EventType::Track, call), &Properties::new(), now())
				.unwrap();

			assert_eq!(envelope.time(), now().timestamp_millis(), "{value:?}");
			assert!(!envelope.properties().contains_key("$time"));
		}
	}

	#[test]
	fn test_invalid_time_type_fails() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let call = Properties::new().insert("$time", true);
		let err = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidPropertyType { .. }));
	}

	#[test]
	fn test_keys_are_normalized() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let call = Properties::new()
			.insert("superMan", "clark")
			.insert("$superMan", "kent");

		let envelope = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap();

		assert_eq!(envelope.properties()["super_man"], "clark");
		assert_eq!(envelope.properties()["$super_man"], "kent");
		assert!(!envelope.properties().contains_key("superMan"));
	}

	#[test]
	fn test_nested_object_is_rejected() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let call = Properties::new().insert("address", serde_json::json!({"city": "Paris"}));

		let err = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap_err();

		assert!(matches!(
			err,
			ValidationError::InvalidPropertyType { kind: "object", .. }
		));
	}

	#[test]
	fn test_dates_are_coerced_to_strings() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let signed_up = Utc.with_ymd_and_hms(2015, 1, 27, 16, 0, 0).unwrap();
		let call = Properties::new().insert("signedUpAt", signed_up);

		let envelope = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap();

		assert_eq!(envelope.properties()["signed_up_at"], "2015-01-27 16:00:00.000");
	}

	#[test]
	fn test_profile_calls_strip_app_version() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let supers = Properties::new().insert("$appVersion", "1.0.8");
		let call = Properties::new()
			.insert("appVersion", "1.0.9")
			.insert("test", "test");

		let envelope = builder
			.build_at(raw(EventType::ProfileSet, call), &supers, now())
			.unwrap();

		assert!(!envelope.properties().contains_key("$app_version"));
		assert!(!envelope.properties().contains_key("app_version"));
		assert_eq!(envelope.properties()["test"], "test");
		assert_eq!(envelope.lib()["$app_version"], "1.0.8");
		assert!(envelope.event().is_none());
	}

	#[test]
	fn test_date_app_version_uses_configured_zone() {
		let released = Utc.with_ymd_and_hms(2015, 1, 27, 16, 0, 0).unwrap();
		let call = Properties::new().insert("$app_version", released);

		for zone in [DateZone::Utc, DateZone::Local] {
			let envelope = EnvelopeBuilder::new(zone)
				.build_at(raw(EventType::Track, call.clone()), &Properties::new(), now())
				.unwrap();

			let expected = format_datetime(&released, zone);
			assert_eq!(envelope.lib()["$app_version"], expected.as_str());
			assert_eq!(envelope.properties()["$app_version"], expected.as_str());
		}
	}

	#[test]
	fn test_track_keeps_app_version_in_properties_and_lib() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let call = Properties::new().insert("$appVersion", "1.0.8");

		let envelope = builder
			.build_at(raw(EventType::Track, call), &Properties::new(), now())
			.unwrap();

		assert_eq!(envelope.properties()["$app_version"], "1.0.8");
		assert_eq!(envelope.lib()["$app_version"], "1.0.8");
	}

	#[test]
	fn test_app_version_precedence() {
		let supers = Properties::new().insert("appVersion", "from-super");
		let call = Properties::new().insert("$app_version", "from-call");
		assert_eq!(
			resolve_app_version(&supers, &call),
			Some(PropertyValue::from("from-super"))
		);

		let supers = Properties::new()
			.insert("appVersion", "camel")
			.insert("$app_version", "canonical");
		assert_eq!(
			resolve_app_version(&supers, &Properties::new()),
			Some(PropertyValue::from("canonical"))
		);

		let supers = Properties::new().insert("$app_version", "");
		let call = Properties::new().insert("appVersion", "2.0");
		assert_eq!(
			resolve_app_version(&supers, &call),
			Some(PropertyValue::from("2.0"))
		);

		assert_eq!(resolve_app_version(&Properties::new(), &Properties::new()), None);
	}

	#[test]
	fn test_lib_carries_identity_and_call_site() {
		let builder = EnvelopeBuilder::new(DateZone::Utc);
		let mut event = raw(EventType::Track, Properties::new());
		event.call_site = Some(CallSite::new("", "", "src/main.rs", 10, 5));

		let envelope = builder
			.build_at(event, &Properties::new(), now())
			.unwrap();

		let lib = envelope.lib();
		assert_eq!(lib["$lib"], SDK_NAME);
		assert_eq!(lib["$lib_version"], SDK_VERSION);
		assert_eq!(lib["$lib_method"], "code");
		assert_eq!(lib["$lib_detail"], "####src/main.rs##10,5");
		assert!(lib.get("$app_version").is_none());
	}

	#[test]
	fn test_snake_case_event_names_applies_to_track_only() {
		let builder = EnvelopeBuilder::new(DateZone::Utc).with_snake_case_event_names(true);
		let mut event = raw(EventType::Track, Properties::new());
		event.event = Some("PageView".to_string());

		let envelope = builder
			.build_at(event, &Properties::new(), now())
			.unwrap();
		assert_eq!(envelope.event(), Some("page_view"));

		let mut signup = raw(EventType::TrackSignup, Properties::new());
		signup.event = Some("$SignUp".to_string());
		let envelope = builder
			.build_at(signup, &Properties::new(), now())
			.unwrap();
		assert_eq!(envelope.event(), Some("$SignUp"));
	}

	#[test]
	fn test_is_app_version_key() {
		for key in ["$app_version", "$appVersion", "appVersion", "app_version"] {
			assert!(is_app_version_key(key), "{key}");
		}
		assert!(!is_app_version_key("app"));
		assert!(!is_app_version_key("version"));
	}
}
