//! Runtime core: orchestration and lifecycle.
//!
//! The public entry point is [`Retry`], which validates a policy, schedules the
//! attempts of one command, and streams their results.
//!
//! Internal modules:
//! - [`orchestrator`]: builds and drives a run, flushes subscribers;
//! - [`attempt`]: runs a single attempt through gate, delay, and process;
//! - [`gate`]: concurrency slots;
//! - [`timer`]: injectable time source for the delay;
//! - [`once`]: one-shot latch for the run-wide cancellation result;
//! - [`stream`]: consumer end of a run;
//! - [`shutdown`]: signal and deadline cancellation sources.

mod attempt;
mod gate;
mod once;
mod orchestrator;
mod shutdown;
mod stream;
mod timer;

pub use gate::{Gate, SemaphoreGate, Slot};
pub use orchestrator::{Retry, RetryBuilder};
pub use shutdown::{cancel_after, cancel_on_signal, wait_for_shutdown_signal};
pub use stream::ResultStream;
pub use timer::{Timer, TokioTimer};
