//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted while a run progresses.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the run driver (`Retry::run`), attempt tasks,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the per-run subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from [`Retry::bus`](crate::Retry::bus).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
