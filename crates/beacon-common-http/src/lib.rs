// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Beacon.
//!
//! This crate provides a pre-configured HTTP client builder with a
//! consistent User-Agent header for every SDK that talks to an ingestion
//! endpoint.

mod client;

pub use client::{builder, user_agent, PLATFORM};
