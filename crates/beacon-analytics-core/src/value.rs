// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The value domain of a property bag.

use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use crate::timestamp::{format_datetime, DateZone};

/// A single property value.
///
/// Only numbers, strings, booleans, arrays and dates are accepted by
/// validation. `Null` and `Object` exist so that callers can hand over
/// arbitrary JSON and get a precise [`ValidationError`](crate::ValidationError)
/// back instead of a silent conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
	Null,
	Bool(bool),
	Number(Number),
	String(String),
	Array(Vec<Value>),
	/// A native date. Validation coerces it to a formatted string, except
	/// for `$time` where it becomes the envelope time.
	DateTime(DateTime<Utc>),
	Object(Map<String, Value>),
}

impl PropertyValue {
	/// Short name of the value's type, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			PropertyValue::Null => "null",
			PropertyValue::Bool(_) => "boolean",
			PropertyValue::Number(_) => "number",
			PropertyValue::String(_) => "string",
			PropertyValue::Array(_) => "array",
			PropertyValue::DateTime(_) => "date",
			PropertyValue::Object(_) => "object",
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropertyValue::String(s) => Some(s),
			_ => None,
		}
	}

	/// Returns true for `Null` and the empty string.
	pub fn is_blank(&self) -> bool {
		match self {
			PropertyValue::Null => true,
			PropertyValue::String(s) => s.is_empty(),
			_ => false,
		}
	}

	/// Converts into JSON. Dates are rendered in the canonical format in UTC.
	pub fn into_json(self) -> Value {
		match self {
			PropertyValue::Null => Value::Null,
			PropertyValue::Bool(b) => Value::Bool(b),
			PropertyValue::Number(n) => Value::Number(n),
			PropertyValue::String(s) => Value::String(s),
			PropertyValue::Array(items) => Value::Array(items),
			PropertyValue::DateTime(dt) => Value::String(format_datetime(&dt, DateZone::Utc)),
			PropertyValue::Object(map) => Value::Object(map),
		}
	}
}

impl From<&str> for PropertyValue {
	fn from(value: &str) -> Self {
		PropertyValue::String(value.to_string())
	}
}

impl From<String> for PropertyValue {
	fn from(value: String) -> Self {
		PropertyValue::String(value)
	}
}

impl From<&String> for PropertyValue {
	fn from(value: &String) -> Self {
		PropertyValue::String(value.clone())
	}
}

impl From<bool> for PropertyValue {
	fn from(value: bool) -> Self {
		PropertyValue::Bool(value)
	}
}

macro_rules! impl_from_integer {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for PropertyValue {
				fn from(value: $ty) -> Self {
					PropertyValue::Number(Number::from(value))
				}
			}
		)*
	};
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for PropertyValue {
	fn from(value: f64) -> Self {
		Number::from_f64(value)
			.map(PropertyValue::Number)
			.unwrap_or(PropertyValue::Null)
	}
}

impl From<f32> for PropertyValue {
	fn from(value: f32) -> Self {
		PropertyValue::from(f64::from(value))
	}
}

impl<T: Into<Value>> From<Vec<T>> for PropertyValue {
	fn from(value: Vec<T>) -> Self {
		PropertyValue::Array(value.into_iter().map(Into::into).collect())
	}
}

impl<Tz: TimeZone> From<DateTime<Tz>> for PropertyValue {
	fn from(value: DateTime<Tz>) -> Self {
		PropertyValue::DateTime(value.with_timezone(&Utc))
	}
}

impl From<SystemTime> for PropertyValue {
	fn from(value: SystemTime) -> Self {
		PropertyValue::DateTime(DateTime::<Utc>::from(value))
	}
}

impl From<Value> for PropertyValue {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => PropertyValue::Null,
			Value::Bool(b) => PropertyValue::Bool(b),
			Value::Number(n) => PropertyValue::Number(n),
			Value::String(s) => PropertyValue::String(s),
			Value::Array(items) => PropertyValue::Array(items),
			Value::Object(map) => PropertyValue::Object(map),
		}
	}
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(PropertyValue::Null)
	}
}

impl From<PropertyValue> for Value {
	fn from(value: PropertyValue) -> Self {
		value.into_json()
	}
}
