//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`]: distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let any = &*panic_err;
                        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Returns `true` when no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers (clones the event once).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// `SubscriberOverflow` events are not re-published if they themselves overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits all worker tasks, so queued events are processed first
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }

    /// Like [`SubscriberSet::shutdown`], but gives up after `grace`.
    ///
    /// Workers still busy when the grace period expires are aborted and
    /// reported in one `EventKind::GraceExceeded` event. Returns `true` when
    /// every worker drained in time.
    pub async fn shutdown_within(self, grace: Duration) -> bool {
        let names: Vec<&'static str> = self.channels.iter().map(|c| c.name).collect();
        drop(self.channels);

        let mut workers = self.workers;
        let drained = tokio::time::timeout(grace, async {
            for h in workers.iter_mut() {
                let _ = h.await;
            }
        })
        .await;
        if drained.is_ok() {
            return true;
        }

        let mut stuck = Vec::new();
        for (name, h) in names.into_iter().zip(&workers) {
            if !h.is_finished() {
                h.abort();
                stuck.push(name);
            }
        }
        self.bus.publish(Event::grace_exceeded(grace, &stuck));
        false
    }
}
