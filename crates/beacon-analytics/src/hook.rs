// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Observation of batch deliveries.
//!
//! Flushes started by the emitter itself (count threshold, deadline, debug
//! mode, timer) have no caller to return an error to. Their outcome is
//! logged through `tracing` and reported to a [`FlushObserver`] injected at
//! construction. Failed batches are never retried or re-enqueued.
//!
//! # Example
//!
//! ```ignore
//! use beacon_analytics::{AnalyticsClient, AnalyticsError, FlushObserver, FlushTrigger};
//!
//! struct CountFailures(std::sync::atomic::AtomicUsize);
//!
//! impl FlushObserver for CountFailures {
//!     fn on_flush_error(&self, _trigger: FlushTrigger, count: usize, _error: &AnalyticsError) {
//!         self.0.fetch_add(count, std::sync::atomic::Ordering::Relaxed);
//!     }
//! }
//!
//! let client = AnalyticsClient::builder()
//!     .server_url("https://ingest.example.com/sa")
//!     .observer(CountFailures(Default::default()))
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::error::AnalyticsError;

/// What caused a batch to be flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
	/// The buffer reached `buffer_count`.
	Threshold,
	/// An enqueue arrived after the flush deadline had passed.
	Deadline,
	/// Debug mode flushes every event on its own.
	Debug,
	/// The deferred-flush timer fired.
	Timer,
	/// [`flush`](crate::AnalyticsClient::flush) was called.
	Explicit,
	/// The final drain performed by [`close`](crate::AnalyticsClient::close).
	Close,
}

impl FlushTrigger {
	/// True for flushes nobody is waiting on.
	pub fn is_implicit(&self) -> bool {
		!matches!(self, FlushTrigger::Explicit | FlushTrigger::Close)
	}
}

/// Receives the outcome of every non-empty batch delivery.
///
/// Called on the delivery task; implementations should be fast.
pub trait FlushObserver: Send + Sync + 'static {
	/// A batch of `count` envelopes was accepted by the submitter.
	fn on_flush(&self, _trigger: FlushTrigger, _count: usize) {}

	/// A batch of `count` envelopes was rejected and dropped.
	fn on_flush_error(&self, _trigger: FlushTrigger, _count: usize, _error: &AnalyticsError) {}
}

/// Type alias for a shared flush observer.
pub type SharedFlushObserver = Arc<dyn FlushObserver>;

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpFlushObserver;

impl FlushObserver for NoOpFlushObserver {}
