// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key normalization into snake_case.

use serde_json::{Map, Value};

use crate::properties::Properties;

/// Marker for system-defined property names.
pub const RESERVED_PREFIX: char = '$';

/// Converts a camelCase or PascalCase identifier to snake_case.
///
/// A word boundary is placed before an uppercase letter that follows a
/// lowercase letter or digit, and before the last letter of an uppercase
/// run when a lowercase letter follows (`HTMLParser` -> `html_parser`).
/// Digits and existing underscores pass through; an underscore is never
/// doubled.
pub fn snake_case(input: &str) -> String {
	let chars: Vec<char> = input.chars().collect();
	let mut out = String::with_capacity(input.len() + 4);

	for (i, &c) in chars.iter().enumerate() {
		if c.is_uppercase() && i > 0 {
			let prev = chars[i - 1];
			let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
			let boundary = prev.is_lowercase()
				|| prev.is_ascii_digit()
				|| (prev.is_uppercase() && next_is_lower);
			if boundary && !out.ends_with('_') {
				out.push('_');
			}
		}
		out.extend(c.to_lowercase());
	}

	out
}

/// Normalizes a single key, keeping a leading `$`.
pub fn normalize_key(key: &str) -> String {
	match key.strip_prefix(RESERVED_PREFIX) {
		Some(rest) => format!("{RESERVED_PREFIX}{}", snake_case(rest)),
		None => snake_case(key),
	}
}

/// Returns a new bag with every key normalized.
///
/// When two keys normalize to the same name, the one that sorts last wins.
pub fn normalize_keys(properties: Properties) -> Properties {
	properties
		.into_iter()
		.map(|(k, v)| (normalize_key(&k), v))
		.collect()
}

/// Normalizes the keys of a JSON object map.
pub fn normalize_json_keys(map: Map<String, Value>) -> Map<String, Value> {
	map.into_iter()
		.map(|(k, v)| (normalize_key(&k), v))
		.collect()
}
