// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The wire record handed to the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of tracking call that produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	Track,
	TrackSignup,
	ProfileSet,
	ProfileSetOnce,
}

impl EventType {
	/// Profile mutations never carry app-version properties.
	pub fn is_profile(&self) -> bool {
		matches!(self, EventType::ProfileSet | EventType::ProfileSetOnce)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			EventType::Track => "track",
			EventType::TrackSignup => "track_signup",
			EventType::ProfileSet => "profile_set",
			EventType::ProfileSetOnce => "profile_set_once",
		}
	}
}

impl std::fmt::Display for EventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated, normalized, timestamped event.
///
/// Envelopes are immutable once built; the fields are only readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	#[serde(rename = "type")]
	event_type: EventType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	event: Option<String>,
	/// Milliseconds since the Unix epoch.
	time: i64,
	distinct_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	original_id: Option<String>,
	#[serde(default)]
	properties: Map<String, Value>,
	#[serde(default)]
	lib: Map<String, Value>,
}

impl Envelope {
	pub fn new(
		event_type: EventType,
		event: Option<String>,
		time: i64,
		distinct_id: String,
		original_id: Option<String>,
		properties: Map<String, Value>,
		lib: Map<String, Value>,
	) -> Self {
		Self {
			event_type,
			event,
			time,
			distinct_id,
			original_id,
			properties,
			lib,
		}
	}

	pub fn event_type(&self) -> EventType {
		self.event_type
	}

	pub fn event(&self) -> Option<&str> {
		self.event.as_deref()
	}

	pub fn time(&self) -> i64 {
		self.time
	}

	pub fn distinct_id(&self) -> &str {
		&self.distinct_id
	}

	pub fn original_id(&self) -> Option<&str> {
		self.original_id.as_deref()
	}

	pub fn properties(&self) -> &Map<String, Value> {
		&self.properties
	}

	pub fn lib(&self) -> &Map<String, Value> {
		&self.lib
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(event_type: EventType, original_id: Option<&str>) -> Envelope {
		let mut properties = Map::new();
		properties.insert("plan".to_string(), Value::from("pro"));
		Envelope::new(
			event_type,
			Some("page_view".to_string()),
			1469721600000,
			"user-1".to_string(),
			original_id.map(str::to_string),
			properties,
			Map::new(),
		)
	}

	#[test]
	fn test_serializes_with_snake_case_fields() {
		let json = serde_json::to_value(sample(EventType::TrackSignup, Some("anon-1"))).unwrap();

		assert_eq!(json["type"], "track_signup");
		assert_eq!(json["distinct_id"], "user-1");
		assert_eq!(json["original_id"], "anon-1");
		assert_eq!(json["time"], 1469721600000i64);
		assert_eq!(json["properties"]["plan"], "pro");
		assert!(json.get("distinctId").is_none());
	}

	#[test]
	fn test_absent_optionals_are_omitted() {
		let json = serde_json::to_value(sample(EventType::Track, None)).unwrap();
		assert!(json.get("original_id").is_none());
	}

	#[test]
	fn test_profile_types() {
		assert!(EventType::ProfileSet.is_profile());
		assert!(EventType::ProfileSetOnce.is_profile());
		assert!(!EventType::Track.is_profile());
		assert!(!EventType::TrackSignup.is_profile());
		assert_eq!(EventType::ProfileSetOnce.to_string(), "profile_set_once");
	}

	#[test]
	fn test_deserialize_from_wire() {
		let envelope: Envelope = serde_json::from_value(serde_json::json!({
			"type": "profile_set",
			"time": 1,
			"distinct_id": "u",
			"properties": {"name": "n"},
			"lib": {"$lib": "Rust"}
		}))
		.unwrap();
		assert_eq!(envelope.event_type(), EventType::ProfileSet);
		assert!(envelope.event().is_none());
		assert_eq!(envelope.lib()["$lib"], "Rust");
	}
}
