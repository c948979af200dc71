//! # retry-exec
//!
//! **retry-exec** runs an external command up to `max` times with bounded
//! concurrency, an optional fixed delay before each attempt, and cooperative
//! cancellation. Every attempt yields an [`AttemptResult`] on a stream the
//! caller consumes; the bundled `retry` binary renders them as a table.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │ CommandSpec  │   │ RetryPolicy  │
//!     │ (name, args) │   │ (max, delay, │
//!     │              │   │ concurrency) │
//!     └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Retry (run orchestrator)                                         │
//! │  - Bus (broadcast events)                                         │
//! │  - Gate (concurrency slots, SemaphoreGate by default)             │
//! │  - Timer (delay source, TokioTimer by default)                    │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  Attempt #1  │   │  Attempt #2  │   │  Attempt #N  │   │
//!     │ gate ► delay │   │ gate ► delay │   │ gate ► delay │   │
//!     │ ► process    │   │ ► process    │   │ ► process    │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ AttemptResult    │                  │                 │ Events
//!      ▼                  ▼                  ▼                 ▼
//! ┌────────────────────────────────┐  ┌──────────────────────────────┐
//! │ ResultStream (mpsc, delivery   │  │ Bus ──► listener ──►         │
//! │ order, cancels run on drop)    │  │ SubscriberSet ──► LogWriter  │
//! └────────────────────────────────┘  └──────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Retry::run(token)
//!   ├─► resolve executable ─ Err ─► one NotFound result, stream ends
//!   ├─► spawn Attempt[1..=max]
//!   │     ├─► acquire slot      (cancellable)
//!   │     ├─► sleep(delay)      (cancellable, once)
//!   │     ├─► run process       (cancellation kills it)
//!   │     └─► send result, release slot
//!   │
//!   ├─ on cancellation:
//!   │     - running attempts report their own (killed) result
//!   │     - waiting/sleeping attempts report one shared Canceled result
//!   │
//!   └─► all attempts done ─► RunFinished ─► subscribers drained ─► stream ends
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Orchestration** | Schedule attempts and stream their results.                  | [`Retry`], [`RetryBuilder`], [`ResultStream`] |
//! | **Command**       | Describe and run the external process.                       | [`CommandSpec`], [`ProcessRunner`], [`AttemptResult`] |
//! | **Policy**        | Attempt count, delay, concurrency.                           | [`RetryPolicy`]                          |
//! | **Extension**     | Replace concurrency or time strategy.                        | [`Gate`], [`Timer`]                      |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).       | [`Subscribe`], [`Event`]                 |
//! | **Cancellation**  | Signal and deadline sources for the run token.               | [`cancel_on_signal`], [`cancel_after`]   |
//! | **Errors**        | Typed errors for configuration and attempts.                 | [`RetryError`], [`ConfigError`]          |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber that emits `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use retry_exec::{CommandSpec, Retry, RetryPolicy};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn retry_exec::Subscribe>> = vec![Arc::new(retry_exec::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn retry_exec::Subscribe>> = Vec::new();
//!
//!     let policy = RetryPolicy::new(3)
//!         .with_concurrency(1)
//!         .with_delay(Duration::from_millis(5));
//!     let retry = Retry::builder(CommandSpec::new("echo").arg("hello"), policy)
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let mut results = retry.run(CancellationToken::new());
//!     while let Some(r) = results.next().await {
//!         assert!(r.is_success());
//!         assert_eq!(r.stdout_lossy(), "hello\n");
//!     }
//!     Ok(())
//! }
//! ```
mod command;
mod config;
mod core;
mod error;
mod events;
mod subscribers;

pub mod duration;
pub mod view;

// ---- Public re-exports ----

pub use command::{AttemptResult, CommandSpec, ProcessRunner};
pub use config::RetryPolicy;
pub use core::{
    Gate, ResultStream, Retry, RetryBuilder, SemaphoreGate, Slot, Timer, TokioTimer, cancel_after,
    cancel_on_signal, wait_for_shutdown_signal,
};
pub use error::{ConfigError, RetryError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
