//! # Attempt: one scheduled execution of the command.
//!
//! Each attempt is its own task and walks a small state machine:
//!
//! ```text
//! Waiting-for-slot ──► Sleeping ──► Running ──► Done
//!        │                 │
//!        └──── token ──────┴──► Cancelled
//! ```
//!
//! ## Architecture
//! ```text
//! Retry::run() ──► Attempt::run()  (one per attempt, all spawned up front)
//!
//!   ├─► publish AttemptWaiting
//!   ├─► gate.acquire(token)          (cancellable)
//!   ├─► publish SlotAcquired
//!   ├─► timer.sleep(delay)           (cancellable, skipped when delay is zero)
//!   ├─► token re-checked
//!   ├─► runner.run_once(token)       (cancellation kills the process)
//!   ├─► release slot
//!   └─► send own result
//! ```
//!
//! ## Rules
//! - A Done attempt sends **exactly one** result, even if the token fired while it ran
//! - A Cancelled attempt sends the run-wide cancellation result **only** if it wins the latch
//! - The slot is released on every path (RAII), including cancellation while sleeping
//! - An attempt sleeps at most once

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    command::{AttemptResult, ProcessRunner},
    core::{gate::Gate, once::SignalOnce, timer::Timer},
    error::RetryError,
    events::{Bus, Event, EventKind},
};

/// Collaborators shared by all attempts of one run.
#[derive(Clone)]
pub(crate) struct AttemptContext {
    pub command: Arc<str>,
    pub runner: ProcessRunner,
    pub gate: Arc<dyn Gate>,
    pub timer: Arc<dyn Timer>,
    pub delay: Option<Duration>,
    pub cancel_reported: Arc<SignalOnce>,
    pub results: mpsc::Sender<AttemptResult>,
    pub bus: Bus,
}

/// A single attempt task.
pub(crate) struct Attempt {
    index: u32,
    ctx: AttemptContext,
}

impl Attempt {
    pub fn new(index: u32, ctx: AttemptContext) -> Self {
        Self { index, ctx }
    }

    /// Drives the attempt to Done or Cancelled.
    pub async fn run(self, token: CancellationToken) {
        self.publish(EventKind::AttemptWaiting);
        let acquired = self.ctx.gate.acquire(&token).await;
        let slot = match acquired {
            Ok(slot) => slot,
            Err(_canceled) => return self.cancelled().await,
        };
        self.publish(EventKind::SlotAcquired);

        if let Some(delay) = self.ctx.delay {
            self.ctx.bus.publish(
                Event::new(EventKind::DelayScheduled)
                    .with_command(Arc::clone(&self.ctx.command))
                    .with_attempt(self.index)
                    .with_delay(delay),
            );
            let sleep = self.ctx.timer.sleep(delay);
            select! {
                biased;
                _ = token.cancelled() => {
                    slot.release();
                    return self.cancelled().await;
                }
                _ = sleep => {}
            }
        }

        if token.is_cancelled() {
            slot.release();
            return self.cancelled().await;
        }

        let result = self.ctx.runner.run_once(self.index, &token, &self.ctx.bus).await;
        slot.release();

        // A closed channel means the consumer is gone; nothing left to report to.
        let _ = self.ctx.results.send(result).await;
    }

    /// Cancelled before running: report for the whole cohort at most once.
    async fn cancelled(self) {
        self.publish(EventKind::AttemptCanceled);
        if !self.ctx.cancel_reported.fire() {
            return;
        }
        self.publish(EventKind::CancelReported);
        let result = AttemptResult::not_executed(Some(self.index), RetryError::Canceled);
        let _ = self.ctx.results.send(result).await;
    }

    fn publish(&self, kind: EventKind) {
        self.ctx.bus.publish(
            Event::new(kind)
                .with_command(Arc::clone(&self.ctx.command))
                .with_attempt(self.index),
        );
    }
}
