//! # Runtime events emitted by the orchestrator and attempt tasks.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Run events**: start, lookup failure, finish
//! - **Attempt events**: waiting, slot acquired, delay, running, finished, canceled
//! - **Subscriber events**: overflow and panic reports from subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the command
//! name, attempt index, reasons, and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use retry_exec::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DelayScheduled)
//!     .with_command("curl")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::DelayScheduled);
//! assert_eq!(ev.command.as_deref(), Some("curl"));
//! assert_eq!(ev.delay_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `command`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `command`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Run events ===
    /// Executable resolved; attempts are about to be spawned.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `attempt`: number of attempts that will be launched
    RunStarted,

    /// Executable lookup failed; the run ends without attempts.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `reason`: lookup error
    LookupFailed,

    /// The run-wide cancellation result was pushed to the stream.
    ///
    /// Published at most once per run.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `attempt`: attempt that won the latch
    CancelReported,

    /// Subscribers did not drain within the grace period and were aborted.
    ///
    /// Published after `RunFinished`, only on the bus (subscribers are gone).
    ///
    /// Sets:
    /// - `delay_ms`: grace period in milliseconds
    /// - `reason`: names of the stuck subscribers
    GraceExceeded,

    /// Every attempt terminated; the last event subscribers receive.
    ///
    /// Sets:
    /// - `command`: command name
    RunFinished,

    // === Attempt lifecycle events ===
    /// Attempt is waiting for a concurrency slot.
    ///
    /// Sets:
    /// - `command`, `attempt`
    AttemptWaiting,

    /// Attempt holds a concurrency slot.
    ///
    /// Sets:
    /// - `command`, `attempt`
    SlotAcquired,

    /// Attempt sleeps before running.
    ///
    /// Sets:
    /// - `command`, `attempt`
    /// - `delay_ms`: delay in milliseconds
    DelayScheduled,

    /// Attempt is starting its process.
    ///
    /// Sets:
    /// - `command`, `attempt`
    AttemptStarting,

    /// Attempt process finished (successfully or not).
    ///
    /// Published before the slot is released.
    ///
    /// Sets:
    /// - `command`, `attempt`
    /// - `reason`: execution error, if any
    AttemptFinished,

    /// Attempt was cancelled while waiting or sleeping and never ran.
    ///
    /// Sets:
    /// - `command`, `attempt`
    AttemptCanceled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Command name (or subscriber name for subscriber events).
    pub command: Option<Arc<str>>,
    /// Attempt index (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before running in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            command: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a command name.
    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches an attempt index.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_command(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_command(subscriber)
            .with_reason(info)
    }

    /// Creates a grace-exceeded event naming the stuck subscribers.
    pub fn grace_exceeded(grace: Duration, stuck: &[&'static str]) -> Self {
        Event::new(EventKind::GraceExceeded)
            .with_delay(grace)
            .with_reason(format!("stuck subscribers: {}", stuck.join(", ")))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Returns `true` for the terminal event of a run.
    #[inline]
    pub fn is_run_finished(&self) -> bool {
        matches!(self.kind, EventKind::RunFinished)
    }
}
