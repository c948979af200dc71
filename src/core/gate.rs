//! # Concurrency gate.
//!
//! Bounds how many attempts may run their process at the same time.
//!
//! [`Gate`] is the seam: the orchestrator only asks for a [`Slot`] and drops it
//! when done, so a priority- or fairness-aware strategy can replace the default
//! [`SemaphoreGate`] without touching the attempt state machine.
//!
//! ## Rules
//! - `acquire` returns as soon as a slot is free **or** the token fires
//! - cancellation wins over a simultaneously free slot
//! - an interrupted acquisition holds nothing (no leaked slot)
//! - dropping a [`Slot`] releases it unconditionally

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{select, sync::Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;

/// Held slot of a [`Gate`]; released on drop.
#[must_use = "dropping a slot releases it immediately"]
pub struct Slot {
    _guard: Option<Box<dyn Send + Sync>>,
}

impl Slot {
    /// Wraps any guard whose drop releases the slot.
    pub fn new(guard: impl Send + Sync + 'static) -> Self {
        Self {
            _guard: Some(Box::new(guard)),
        }
    }

    /// A slot that does not limit anything.
    pub fn unbounded() -> Self {
        Self { _guard: None }
    }

    /// Returns the slot to its gate.
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot").finish_non_exhaustive()
    }
}

/// Bounded slot pool shared by all attempts of a run.
#[async_trait]
pub trait Gate: Send + Sync + 'static {
    /// Waits for a free slot, or fails with [`RetryError::Canceled`] once `token` fires.
    async fn acquire(&self, token: &CancellationToken) -> Result<Slot, RetryError>;
}

/// Plain counting semaphore; any release can satisfy any waiter.
#[derive(Clone, Debug)]
pub struct SemaphoreGate {
    semaphore: Arc<Semaphore>,
}

impl SemaphoreGate {
    /// Creates a gate with `capacity` slots (min 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Number of currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl Gate for SemaphoreGate {
    async fn acquire(&self, token: &CancellationToken) -> Result<Slot, RetryError> {
        if token.is_cancelled() {
            return Err(RetryError::Canceled);
        }
        let permit = Arc::clone(&self.semaphore).acquire_owned();
        tokio::pin!(permit);

        select! {
            biased;
            _ = token.cancelled() => Err(RetryError::Canceled),
            res = &mut permit => match res {
                Ok(permit) => Ok(Slot::new(permit)),
                Err(_closed) => Err(RetryError::Canceled),
            },
        }
    }
}
