// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Beacon product analytics.
//!
//! This crate is runtime-free: it holds the property value domain, the
//! property bag, key validation and normalization, timestamp handling and
//! the wire envelope. The SDK crate (`beacon-analytics`) composes these into
//! the buffered tracking client.
//!
//! # Key conventions
//!
//! - Keys starting with `$` are system properties. The `$` survives
//!   normalization: `$superMan` becomes `$super_man`.
//! - All other keys are rewritten to snake_case: `superMan` becomes
//!   `super_man`.
//! - `$time` is special: it carries the event time and is removed from the
//!   property bag when an envelope is built.

pub mod call_site;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod properties;
pub mod timestamp;
pub mod validate;
pub mod value;

pub use call_site::CallSite;
pub use envelope::{Envelope, EventType};
pub use error::ValidationError;
pub use normalize::{normalize_json_keys, normalize_key, normalize_keys, snake_case, RESERVED_PREFIX};
pub use properties::Properties;
pub use timestamp::{
	extract_timestamp, format_datetime, resolve_timestamp, DateZone, DATE_FORMAT, TIME_KEY,
};
pub use validate::{
	check_event_name, check_key_exists, check_key_pattern, check_properties, check_property_keys,
	check_value_type, MAX_KEY_LENGTH, MAX_VALUE_LENGTH, RESERVED_WORDS,
};
pub use value::PropertyValue;
