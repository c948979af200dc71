//! # Time source for the inter-attempt delay.
//!
//! The orchestrator never calls `tokio::time::sleep` directly; it asks the
//! injected [`Timer`]. Production uses [`TokioTimer`]; tests pass a timer whose
//! sleeps complete only when the test says so.

use std::time::Duration;

use futures::future::BoxFuture;

/// Capability to wait for a duration.
pub trait Timer: Send + Sync + 'static {
    /// Future that completes after `delay`.
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// Wall-clock timer backed by `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
