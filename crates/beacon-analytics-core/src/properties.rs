// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The property bag attached to events, profiles and super properties.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::value::PropertyValue;

/// A bag of event or profile properties.
///
/// # Example
///
/// ```
/// use beacon_analytics_core::Properties;
///
/// let props = Properties::new()
///     .insert("buttonName", "checkout")
///     .insert("price", 99.99)
///     .insert("isPremium", true);
/// assert_eq!(props.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
	inner: BTreeMap<String, PropertyValue>,
}

impl Properties {
	/// Creates a new empty bag.
	pub fn new() -> Self {
		Self {
			inner: BTreeMap::new(),
		}
	}

	/// Inserts a key-value pair (builder style).
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<PropertyValue>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Inserts a key-value pair in place, returning the previous value.
	pub fn set<K, V>(&mut self, key: K, value: V) -> Option<PropertyValue>
	where
		K: Into<String>,
		V: Into<PropertyValue>,
	{
		self.inner.insert(key.into(), value.into())
	}

	pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
		self.inner.remove(key)
	}

	/// Merges another bag into this one.
	///
	/// If both contain the same key, the value from `other` takes precedence.
	pub fn merge(mut self, other: Properties) -> Self {
		self.inner.extend(other.inner);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn get(&self, key: &str) -> Option<&PropertyValue> {
		self.inner.get(key)
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
		self.inner.get_mut(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.inner.contains_key(key)
	}

	/// Iterates over entries in key order.
	pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
		self.inner.iter()
	}

	/// Returns the keys in key order.
	pub fn keys(&self) -> Vec<String> {
		self.inner.keys().cloned().collect()
	}

	/// Keeps only the entries for which `keep` returns true.
	pub fn retain<F>(&mut self, mut keep: F)
	where
		F: FnMut(&str, &PropertyValue) -> bool,
	{
		self.inner.retain(|k, v| keep(k, v));
	}

	/// Converts the bag into a JSON object map.
	pub fn into_json_map(self) -> Map<String, Value> {
		self.inner
			.into_iter()
			.map(|(k, v)| (k, v.into_json()))
			.collect()
	}

	/// Converts the bag into a `serde_json::Value::Object`.
	pub fn into_value(self) -> Value {
		Value::Object(self.into_json_map())
	}
}

impl From<Properties> for Value {
	fn from(props: Properties) -> Self {
		props.into_value()
	}
}

impl From<Value> for Properties {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(map) => Self::from(map),
			_ => Self::new(),
		}
	}
}

impl From<Map<String, Value>> for Properties {
	fn from(map: Map<String, Value>) -> Self {
		map.into_iter().collect()
	}
}

impl<K, V> FromIterator<(K, V)> for Properties
where
	K: Into<String>,
	V: Into<PropertyValue>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			inner: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl IntoIterator for Properties {
	type Item = (String, PropertyValue);
	type IntoIter = btree_map::IntoIter<String, PropertyValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.inner.into_iter()
	}
}

impl<'a> IntoIterator for &'a Properties {
	type Item = (&'a String, &'a PropertyValue);
	type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.inner.iter()
	}
}
