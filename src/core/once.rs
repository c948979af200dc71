//! One-shot latch shared by the attempts of a run.
//!
//! Many attempts can observe cancellation at the same instant; only the first
//! caller of [`SignalOnce::fire`] gets `true`. No ordering between racing
//! callers is implied.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub(crate) struct SignalOnce {
    fired: AtomicBool,
}

impl SignalOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for exactly one caller.
    pub fn fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fires_once_sequentially() {
        let once = SignalOnce::new();
        assert!(!once.has_fired());
        assert!(once.fire());
        assert!(!once.fire());
        assert!(once.has_fired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fires_once_under_contention() {
        let once = Arc::new(SignalOnce::new());
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let once = Arc::clone(&once);
                tokio::spawn(async move { once.fire() })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            if h.await.expect("join") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
