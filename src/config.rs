//! # Retry policy.
//!
//! Provides [`RetryPolicy`], the read-only settings of one run.
//!
//! ## Field semantics
//! - `max`: total number of attempts launched (min 1)
//! - `delay`: wait before each attempt enters the process phase (`0s` = no wait)
//! - `concurrency`: cap on simultaneously running attempts (min 1)
//!
//! Values are checked by [`RetryPolicy::validate`]; the orchestrator builder
//! refuses an invalid policy, so a run never starts with `max == 0` or
//! `concurrency == 0`.

use std::time::Duration;

use crate::error::ConfigError;

/// Attempt count, inter-attempt delay, and concurrency cap of a run.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use retry_exec::RetryPolicy;
///
/// let policy = RetryPolicy::new(3)
///     .with_delay(Duration::from_millis(250))
///     .with_concurrency(2);
/// assert!(policy.validate().is_ok());
/// assert_eq!(policy.max, 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of attempts to launch.
    pub max: usize,

    /// Delay observed by every attempt after it gets a slot.
    ///
    /// Each attempt sleeps once; it is never delayed again.
    pub delay: Duration,

    /// Maximum number of attempts running their process at the same time.
    pub concurrency: usize,
}

impl RetryPolicy {
    /// Policy with `max` attempts, no delay, one at a time.
    pub fn new(max: usize) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    /// Returns a new policy with updated delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns a new policy with updated concurrency cap.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Checks `1 <= max <= u32::MAX` and `concurrency >= 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if u32::try_from(self.max).is_err() {
            return Err(ConfigError::TooManyAttempts { limit: u32::MAX });
        }
        Ok(())
    }

    /// Returns the delay as an `Option`.
    ///
    /// - `None` → attempts go straight from slot to process
    /// - `Some(d)` → each attempt sleeps `d` once
    #[inline]
    pub fn sleep(&self) -> Option<Duration> {
        if self.delay.is_zero() {
            None
        } else {
            Some(self.delay)
        }
    }

    /// Number of slots the concurrency gate needs.
    ///
    /// Never more than `max`: extra slots could not be used.
    #[inline]
    pub fn slots(&self) -> usize {
        self.concurrency.clamp(1, self.max.max(1))
    }

    /// Whether attempts never overlap, which makes per-attempt CPU accounting exact.
    #[inline]
    pub fn is_sequential(&self) -> bool {
        self.slots() == 1
    }
}

impl Default for RetryPolicy {
    /// Defaults:
    ///
    /// - `max = 1`
    /// - `delay = 0s`
    /// - `concurrency = 1`
    fn default() -> Self {
        Self {
            max: 1,
            delay: Duration::ZERO,
            concurrency: 1,
        }
    }
}
