//! # LogWriter: lifecycle events as tracing records
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records, so the
//! installed subscriber (see the `retry` binary) decides what reaches the terminal.
//!
//! ## Levels
//! ```text
//! debug  waiting / slot / delay / starting
//! info   run started, attempt finished, run finished
//! warn   lookup failed, canceled, grace exceeded, subscriber overflow/panic
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let command = e.command.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::RunStarted => {
                info!(command, attempts = e.attempt, "run started");
            }
            EventKind::LookupFailed => {
                warn!(command, err = reason, "lookup failed");
            }
            EventKind::AttemptWaiting => {
                debug!(command, attempt = e.attempt, "waiting for slot");
            }
            EventKind::SlotAcquired => {
                debug!(command, attempt = e.attempt, "slot acquired");
            }
            EventKind::DelayScheduled => {
                debug!(command, attempt = e.attempt, delay_ms = e.delay_ms, "sleeping");
            }
            EventKind::AttemptStarting => {
                debug!(command, attempt = e.attempt, "starting");
            }
            EventKind::AttemptFinished if e.reason.is_some() => {
                info!(command, attempt = e.attempt, err = reason, "attempt failed");
            }
            EventKind::AttemptFinished => {
                info!(command, attempt = e.attempt, "attempt succeeded");
            }
            EventKind::AttemptCanceled => {
                debug!(command, attempt = e.attempt, "canceled before running");
            }
            EventKind::CancelReported => {
                warn!(command, attempt = e.attempt, "run canceled");
            }
            EventKind::RunFinished => {
                info!(command, "run finished");
            }
            EventKind::GraceExceeded => {
                warn!(grace_ms = e.delay_ms, stuck = reason, "subscribers did not drain in time");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = command, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = command, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
