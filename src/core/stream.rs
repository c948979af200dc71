//! # Result stream.
//!
//! [`ResultStream`] is the consumer end of a run: attempt outcomes arrive in
//! delivery order (not attempt-index order) and the stream ends once every
//! attempt task has terminated.
//!
//! Dropping the stream cancels the run: waiting attempts stop and running
//! processes are killed.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use crate::command::AttemptResult;

/// Delivery-ordered stream of [`AttemptResult`]s.
///
/// ## Example
/// ```rust
/// use retry_exec::{CommandSpec, Retry, RetryPolicy};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let retry = Retry::builder(CommandSpec::new("true"), RetryPolicy::new(2)).build()?;
/// let mut results = retry.run(CancellationToken::new());
/// while let Some(r) = results.next().await {
///     assert!(r.executed);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ResultStream {
    rx: mpsc::Receiver<AttemptResult>,
    _cancel_on_drop: DropGuard,
}

impl ResultStream {
    pub(crate) fn new(rx: mpsc::Receiver<AttemptResult>, guard: DropGuard) -> Self {
        Self {
            rx,
            _cancel_on_drop: guard,
        }
    }

    /// Waits for the next result; `None` once the run is over.
    pub async fn next(&mut self) -> Option<AttemptResult> {
        self.rx.recv().await
    }

    /// Consumes the stream and returns every result in delivery order.
    pub async fn collect_all(mut self) -> Vec<AttemptResult> {
        let mut out = Vec::new();
        while let Some(r) = self.rx.recv().await {
            out.push(r);
        }
        out
    }

    /// Returns an already delivered result without waiting.
    pub fn try_next(&mut self) -> Option<AttemptResult> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ResultStream {
    type Item = AttemptResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
