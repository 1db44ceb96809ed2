// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Buffered delivery of envelopes.
//!
//! The [`BufferedEmitter`] accumulates envelopes and hands them to a
//! [`Submitter`] in batches. A batch is cut when one of these holds after an
//! enqueue:
//!
//! - debug mode is on
//! - the buffer reached `buffer_count`
//! - the flush deadline (`buffer_window` after the previous non-empty flush)
//!   has passed
//!
//! Otherwise a single deferred-flush timer is (re)armed for the deadline.
//! Re-arming always aborts the previous timer, so at most one is pending.
//!
//! Batches are delivered in order by one background task. Producers never
//! wait on the network: while a batch is in flight new envelopes collect in
//! a fresh buffer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use beacon_analytics_core::Envelope;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::error::{AnalyticsError, Result};
use crate::hook::{FlushTrigger, SharedFlushObserver};
use crate::options::AnalyticsOptions;
use crate::submitter::Submitter;

/// Observable state of a [`BufferedEmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterPhase {
	/// Buffer empty, no timer armed.
	Idle,
	/// Envelopes are waiting for a flush trigger.
	Accumulating,
	/// At least one batch is being submitted.
	Flushing,
}

/// Batching thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterConfig {
	pub buffer_count: usize,
	pub buffer_window: Duration,
	pub debug: bool,
}

impl Default for EmitterConfig {
	fn default() -> Self {
		Self {
			buffer_count: 1,
			buffer_window: Duration::from_secs(5),
			debug: false,
		}
	}
}

impl From<&AnalyticsOptions> for EmitterConfig {
	fn from(options: &AnalyticsOptions) -> Self {
		Self {
			buffer_count: options.buffer_count.max(1),
			buffer_window: options.buffer_window,
			debug: options.is_debug(),
		}
	}
}

/// Result of the final drain, shared with every `close` caller.
type CloseOutcome = std::result::Result<(), String>;

/// A batch on its way to the delivery task.
struct Dispatch {
	batch: Vec<Envelope>,
	trigger: FlushTrigger,
	reply: Option<oneshot::Sender<Result<()>>>,
}

struct ArmedTimer {
	generation: u64,
	handle: JoinHandle<()>,
}

struct EmitterState {
	buffer: Vec<Envelope>,
	next_submit_at: Instant,
	timer: Option<ArmedTimer>,
	timer_generation: u64,
	/// `None` once the emitter is closed.
	dispatch_tx: Option<mpsc::UnboundedSender<Dispatch>>,
}

impl EmitterState {
	fn cancel_timer(&mut self) {
		if let Some(timer) = self.timer.take() {
			timer.handle.abort();
			trace!(generation = timer.generation, "flush timer cancelled");
		}
	}
}

struct Shared {
	config: EmitterConfig,
	state: Mutex<EmitterState>,
	in_flight: Arc<AtomicUsize>,
}

impl Shared {
	/// Pops the whole buffer and queues it for delivery.
	///
	/// An empty buffer is only queued when someone waits on the reply, so
	/// that the reply arrives after every earlier batch.
	fn dispatch(
		&self,
		state: &mut EmitterState,
		trigger: FlushTrigger,
		reply: Option<oneshot::Sender<Result<()>>>,
	) -> Result<()> {
		let batch = std::mem::take(&mut state.buffer);
		if batch.is_empty() && reply.is_none() {
			return Ok(());
		}

		let Some(tx) = state.dispatch_tx.as_ref() else {
			return Err(AnalyticsError::ClientShutdown);
		};

		let count = batch.len();
		if count > 0 {
			state.next_submit_at = Instant::now() + self.config.buffer_window;
			self.in_flight.fetch_add(1, Ordering::SeqCst);
		}

		debug!(?trigger, count, "flushing batch");

		tx.send(Dispatch {
			batch,
			trigger,
			reply,
		})
		.map_err(|_| {
			if count > 0 {
				self.in_flight.fetch_sub(1, Ordering::SeqCst);
			}
			AnalyticsError::DeliveryStopped
		})
	}

	fn arm_timer(self: &Arc<Self>, state: &mut EmitterState) {
		state.cancel_timer();
		state.timer_generation += 1;

		let generation = state.timer_generation;
		let deadline = state.next_submit_at;
		let shared: Weak<Shared> = Arc::downgrade(self);

		let handle = tokio::spawn(async move {
			tokio::time::sleep_until(deadline).await;

			let Some(shared) = shared.upgrade() else {
				return;
			};
			let mut state = shared.state.lock().await;
			if state.timer.as_ref().map(|t| t.generation) != Some(generation) {
				return;
			}
			state.timer = None;

			if let Err(e) = shared.dispatch(&mut state, FlushTrigger::Timer, None) {
				warn!(error = %e, "timer flush could not be queued");
			}
		});

		trace!(
			generation,
			delay_ms = deadline
				.saturating_duration_since(Instant::now())
				.as_millis() as u64,
			"flush timer armed"
		);
		state.timer = Some(ArmedTimer { generation, handle });
	}
}

/// Accumulates envelopes and flushes them through a [`Submitter`].
///
/// Must be created inside a Tokio runtime; the delivery task is spawned on
/// construction.
pub struct BufferedEmitter {
	shared: Arc<Shared>,
	delivery: Mutex<Option<JoinHandle<()>>>,
	closed: watch::Receiver<Option<CloseOutcome>>,
}

impl BufferedEmitter {
	pub fn new(
		config: EmitterConfig,
		submitter: Arc<dyn Submitter>,
		observer: SharedFlushObserver,
	) -> Self {
		let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
		let in_flight = Arc::new(AtomicUsize::new(0));
		let (closed_tx, closed) = watch::channel(None);

		let state = EmitterState {
			buffer: Vec::with_capacity(config.buffer_count),
			next_submit_at: Instant::now() + config.buffer_window,
			timer: None,
			timer_generation: 0,
			dispatch_tx: Some(dispatch_tx),
		};

		let delivery = tokio::spawn(deliver(
			dispatch_rx,
			submitter,
			observer,
			Arc::clone(&in_flight),
			closed_tx,
		));

		debug!(
			buffer_count = config.buffer_count,
			buffer_window_ms = config.buffer_window.as_millis() as u64,
			debug = config.debug,
			"emitter started"
		);

		Self {
			shared: Arc::new(Shared {
				config,
				state: Mutex::new(state),
				in_flight,
			}),
			delivery: Mutex::new(Some(delivery)),
			closed,
		}
	}

	pub fn config(&self) -> &EmitterConfig {
		&self.shared.config
	}

	/// Appends an envelope and flushes or re-arms the timer.
	///
	/// Returns [`AnalyticsError::ClientShutdown`] once [`close`](Self::close)
	/// has started. Failures of the batch this enqueue triggers are not
	/// returned here; they go to the flush observer.
	pub async fn enqueue(&self, envelope: Envelope) -> Result<()> {
		let mut state = self.shared.state.lock().await;
		if state.dispatch_tx.is_none() {
			return Err(AnalyticsError::ClientShutdown);
		}

		state.buffer.push(envelope);
		state.cancel_timer();

		let config = &self.shared.config;
		let trigger = if config.debug {
			Some(FlushTrigger::Debug)
		} else if state.buffer.len() >= config.buffer_count {
			Some(FlushTrigger::Threshold)
		} else if Instant::now() >= state.next_submit_at {
			Some(FlushTrigger::Deadline)
		} else {
			None
		};

		match trigger {
			Some(trigger) => self.shared.dispatch(&mut state, trigger, None),
			None => {
				self.shared.arm_timer(&mut state);
				Ok(())
			}
		}
	}

	/// Flushes everything buffered and waits for it to be submitted.
	///
	/// Waits for earlier batches too. With nothing buffered no request is
	/// made. The submitter's error for this batch is returned.
	pub async fn flush(&self) -> Result<()> {
		let reply = {
			let mut state = self.shared.state.lock().await;
			if state.dispatch_tx.is_none() {
				return Ok(());
			}
			state.cancel_timer();

			let (tx, rx) = oneshot::channel();
			self.shared
				.dispatch(&mut state, FlushTrigger::Explicit, Some(tx))?;
			rx
		};

		reply.await.map_err(|_| AnalyticsError::DeliveryStopped)?
	}

	/// Stops accepting envelopes and drains the buffer.
	///
	/// Batches already in flight complete first. The final batch is
	/// submitted even below the count threshold, and its error is returned.
	/// Later calls wait for that drain and report its outcome, a failure as
	/// [`AnalyticsError::CloseFailed`].
	pub async fn close(&self) -> Result<()> {
		let reply = {
			let mut state = self.shared.state.lock().await;
			if state.dispatch_tx.is_none() {
				drop(state);
				return self.wait_closed().await;
			}
			state.cancel_timer();

			let (tx, rx) = oneshot::channel();
			let queued = self
				.shared
				.dispatch(&mut state, FlushTrigger::Close, Some(tx));
			state.dispatch_tx = None;
			queued?;
			rx
		};

		let result = reply
			.await
			.map_err(|_| AnalyticsError::DeliveryStopped)
			.and_then(|r| r);

		if let Some(handle) = self.delivery.lock().await.take() {
			if let Err(e) = handle.await {
				warn!(error = %e, "delivery task ended abnormally");
			}
		}

		debug!(success = result.is_ok(), "emitter closed");
		result
	}

	async fn wait_closed(&self) -> Result<()> {
		let mut closed = self.closed.clone();
		let outcome = closed
			.wait_for(Option::is_some)
			.await
			.map_err(|_| AnalyticsError::DeliveryStopped)?;

		match outcome.as_ref() {
			Some(Err(message)) => Err(AnalyticsError::CloseFailed(message.clone())),
			_ => Ok(()),
		}
	}

	pub async fn phase(&self) -> EmitterPhase {
		if self.shared.in_flight.load(Ordering::SeqCst) > 0 {
			return EmitterPhase::Flushing;
		}
		let state = self.shared.state.lock().await;
		if state.buffer.is_empty() && state.timer.is_none() {
			EmitterPhase::Idle
		} else {
			EmitterPhase::Accumulating
		}
	}

	/// Number of envelopes waiting for a flush.
	pub async fn buffered_len(&self) -> usize {
		self.shared.state.lock().await.buffer.len()
	}

	pub async fn is_closed(&self) -> bool {
		self.shared.state.lock().await.dispatch_tx.is_none()
	}
}

impl Drop for BufferedEmitter {
	fn drop(&mut self) {
		if let Ok(mut state) = self.shared.state.try_lock() {
			state.cancel_timer();
			if !state.buffer.is_empty() {
				warn!(
					pending = state.buffer.len(),
					"emitter dropped with buffered events; call close() to deliver them"
				);
			}
		}
	}
}

/// Submits batches one at a time, in the order they were dispatched.
async fn deliver(
	mut rx: mpsc::UnboundedReceiver<Dispatch>,
	submitter: Arc<dyn Submitter>,
	observer: SharedFlushObserver,
	in_flight: Arc<AtomicUsize>,
	closed: watch::Sender<Option<CloseOutcome>>,
) {
	while let Some(Dispatch {
		batch,
		trigger,
		reply,
	}) = rx.recv().await
	{
		let count = batch.len();
		let result = if count == 0 {
			Ok(())
		} else {
			let result = submitter.submit(batch).await;
			in_flight.fetch_sub(1, Ordering::SeqCst);
			result
		};

		match &result {
			Ok(()) if count > 0 => {
				debug!(?trigger, count, "batch submitted");
				observer.on_flush(trigger, count);
			}
			Ok(()) => {}
			Err(e) => {
				if trigger.is_implicit() {
					error!(?trigger, count, error = %e, "batch dropped after failed submit");
				} else {
					warn!(?trigger, count, error = %e, "batch submit failed");
				}
				observer.on_flush_error(trigger, count, e);
			}
		}

		if trigger == FlushTrigger::Close {
			let outcome = match &result {
				Ok(()) => Ok(()),
				Err(e) => Err(e.to_string()),
			};
			closed.send_replace(Some(outcome));
		}

		if let Some(reply) = reply {
			let _ = reply.send(result);
		}
	}

	debug!("delivery task stopped");
}
