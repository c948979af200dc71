//! # Attempt outcome.
//!
//! [`AttemptResult`] is the single item type of the result stream. It is
//! created once by the attempt that produced it and never mutated afterwards.
//!
//! Two shapes exist:
//! - **executed**: the process ran (possibly killed on cancellation); output,
//!   status and timings are filled in.
//! - **not executed**: the run-wide entry for a lookup failure or for the
//!   attempts cancelled while waiting; it carries an error and zero durations.

use std::time::Duration;

use crate::error::RetryError;

/// Outcome of one attempt (or the run-wide cancellation/lookup entry).
#[derive(Clone, Debug, Default)]
pub struct AttemptResult {
    /// Attempt index (1-based); `None` for the lookup-failure entry.
    pub attempt: Option<u32>,
    /// Whether a process was actually spawned.
    pub executed: bool,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Process exited with status zero.
    pub success: bool,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// User CPU time, when it could be measured exactly.
    pub user_time: Option<Duration>,
    /// System CPU time, when it could be measured exactly.
    pub system_time: Option<Duration>,
    /// Wall-clock time from spawn to exit.
    pub real_time: Duration,
    /// Lookup, cancellation, or execution error.
    pub error: Option<RetryError>,
}

impl AttemptResult {
    /// Entry for an attempt (or a whole run) that never spawned a process.
    pub fn not_executed(attempt: Option<u32>, error: RetryError) -> Self {
        Self {
            attempt,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Returns `true` if the process ran and exited with status zero.
    pub fn is_success(&self) -> bool {
        self.executed && self.success && self.error.is_none()
    }

    /// Returns `true` if this entry reports a cancellation.
    pub fn is_canceled(&self) -> bool {
        self.error.as_ref().is_some_and(RetryError::is_canceled)
    }

    /// Captured stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Captured stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_executed_has_zero_timings() {
        let r = AttemptResult::not_executed(None, RetryError::Canceled);
        assert!(!r.executed);
        assert!(r.is_canceled());
        assert!(!r.is_success());
        assert_eq!(r.real_time, Duration::ZERO);
        assert!(r.user_time.is_none());
    }
}
