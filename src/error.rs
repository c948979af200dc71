//! Error types used by the retry runtime and individual attempts.
//!
//! This module defines two enums:
//!
//! - [`RetryError`]: errors attached to an [`AttemptResult`](crate::AttemptResult).
//!   They travel through the result stream as data, never as control flow.
//! - [`ConfigError`]: invalid policy values, rejected before a run starts.
//!
//! [`RetryError`] provides `as_label` for logs and [`RetryError::is_fatal`] to
//! tell run-ending errors apart from per-attempt execution errors.

use std::sync::Arc;
use thiserror::Error;

/// # Errors reported for a run or a single attempt.
///
/// Lookup and cancellation errors end the run (no further attempts are
/// scheduled); execution errors belong to one attempt and retries continue.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RetryError {
    /// Executable could not be located; no attempt is ever spawned.
    #[error("exec: {name:?}: executable file not found in $PATH")]
    NotFound {
        /// The name the caller asked for.
        name: String,
    },

    /// Cancellation token fired (signal, deadline, or dropped stream).
    #[error("context canceled")]
    Canceled,

    /// Process ran to completion with a non-zero exit status.
    #[error("exit status {code}")]
    Exit {
        /// Exit code reported by the OS.
        code: i32,
    },

    /// Process was terminated by a signal it did not handle.
    #[error("signal: {signal}")]
    Signaled {
        /// Signal number.
        signal: i32,
    },

    /// Process could not be started.
    #[error("failed to spawn: {error}")]
    Spawn {
        /// Underlying I/O error.
        error: Arc<std::io::Error>,
    },

    /// Waiting on the process or reading its output failed.
    #[error("i/o error: {error}")]
    Io {
        /// Underlying I/O error.
        error: Arc<std::io::Error>,
    },
}

impl RetryError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use retry_exec::RetryError;
    ///
    /// assert_eq!(RetryError::Canceled.as_label(), "canceled");
    /// assert_eq!(RetryError::Exit { code: 3 }.as_label(), "exit_status");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::NotFound { .. } => "not_found",
            RetryError::Canceled => "canceled",
            RetryError::Exit { .. } => "exit_status",
            RetryError::Signaled { .. } => "signaled",
            RetryError::Spawn { .. } => "spawn_failed",
            RetryError::Io { .. } => "io_failed",
        }
    }

    /// Indicates whether the error ends the whole run.
    ///
    /// Returns `true` for [`RetryError::NotFound`] and [`RetryError::Canceled`].
    /// Execution errors are per attempt and never stop the remaining retries.
    ///
    /// # Example
    /// ```
    /// use retry_exec::RetryError;
    ///
    /// assert!(RetryError::NotFound { name: "nope".into() }.is_fatal());
    /// assert!(!RetryError::Exit { code: 1 }.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::NotFound { .. } | RetryError::Canceled)
    }

    /// Returns `true` if this is a cancellation error.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, RetryError::Canceled)
    }

    pub(crate) fn spawn(error: std::io::Error) -> Self {
        RetryError::Spawn {
            error: Arc::new(error),
        }
    }

    pub(crate) fn io(error: std::io::Error) -> Self {
        RetryError::Io {
            error: Arc::new(error),
        }
    }
}

/// # Errors produced while validating a [`RetryPolicy`](crate::RetryPolicy).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max` must allow at least one attempt.
    #[error("maximum number of attempts must be at least 1")]
    ZeroAttempts,

    /// `concurrency` must allow at least one running attempt.
    #[error("minimum parallel execution is 1")]
    ZeroConcurrency,

    /// `max` does not fit the 32-bit attempt index.
    #[error("maximum number of attempts is {limit}")]
    TooManyAttempts {
        /// Largest accepted `max`.
        limit: u32,
    },
}
