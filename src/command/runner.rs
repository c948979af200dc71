//! # Run a single attempt of the command.
//!
//! Spawns the resolved program once, captures its output in memory, and
//! publishes lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! publish AttemptStarting
//!   spawn ─► wait_with_output ─► publish AttemptFinished (reason = error, if any)
//!       └─► token cancelled   ─► drop child (SIGKILL) ─► publish AttemptFinished (canceled)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** `AttemptFinished` per `AttemptStarting`
//! - Never returns an error: every outcome is an [`AttemptResult`]
//! - A cancelled process is killed, not merely abandoned (`kill_on_drop`)
//! - Output of a killed process is discarded

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    command::{outcome::AttemptResult, usage::CpuTimes},
    error::RetryError,
    events::{Bus, Event, EventKind},
};

/// Executes attempts of one resolved program.
///
/// Cheap to clone; every attempt task holds its own copy.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    name: Arc<str>,
    program: PathBuf,
    args: Arc<[String]>,
    cpu_times: bool,
}

impl ProcessRunner {
    /// Creates a runner for an already resolved program path.
    pub fn new(name: Arc<str>, program: PathBuf, args: Arc<[String]>) -> Self {
        Self {
            name,
            program,
            args,
            cpu_times: false,
        }
    }

    /// Enables user/system time accounting.
    ///
    /// Only exact when no other child process is reaped during an attempt.
    pub fn with_cpu_times(mut self, enabled: bool) -> Self {
        self.cpu_times = enabled;
        self
    }

    /// Runs attempt `attempt` to completion or until `token` fires.
    pub async fn run_once(&self, attempt: u32, token: &CancellationToken, bus: &Bus) -> AttemptResult {
        bus.publish(
            Event::new(EventKind::AttemptStarting)
                .with_command(Arc::clone(&self.name))
                .with_attempt(attempt),
        );

        let result = self.execute(attempt, token).await;

        let mut ev = Event::new(EventKind::AttemptFinished)
            .with_command(Arc::clone(&self.name))
            .with_attempt(attempt);
        if let Some(err) = &result.error {
            ev = ev.with_reason(err.to_string());
        }
        bus.publish(ev);
        result
    }

    async fn execute(&self, attempt: u32, token: &CancellationToken) -> AttemptResult {
        let before = if self.cpu_times {
            CpuTimes::children()
        } else {
            None
        };
        let started = Instant::now();

        let mut result = AttemptResult {
            attempt: Some(attempt),
            executed: true,
            ..AttemptResult::default()
        };

        let child = Command::new(&self.program)
            .args(self.args.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                result.real_time = started.elapsed();
                result.error = Some(RetryError::spawn(e));
                return result;
            }
        };

        let output = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            out = child.wait_with_output() => Some(out),
        };
        result.real_time = started.elapsed();

        match output {
            None => {
                result.error = Some(RetryError::Canceled);
            }
            Some(Err(e)) => {
                result.error = Some(RetryError::io(e));
            }
            Some(Ok(out)) => {
                result.stdout = out.stdout;
                result.stderr = out.stderr;
                result.success = out.status.success();
                result.exit_code = out.status.code();
                result.error = exit_error(out.status);

                if let Some(delta) = before
                    .zip(CpuTimes::children())
                    .map(|(before, after)| after.since(before))
                {
                    result.user_time = Some(delta.user);
                    result.system_time = Some(delta.system);
                }
            }
        }
        result
    }
}

/// Maps a non-zero exit status to its execution error.
fn exit_error(status: ExitStatus) -> Option<RetryError> {
    if status.success() {
        return None;
    }
    if let Some(code) = status.code() {
        return Some(RetryError::Exit { code });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(RetryError::Signaled { signal });
        }
    }
    Some(RetryError::Exit { code: -1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runner(script: &str) -> ProcessRunner {
        ProcessRunner::new(
            Arc::from("sh"),
            PathBuf::from("/bin/sh"),
            Arc::from(vec!["-c".to_string(), script.to_string()]),
        )
    }

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let bus = Bus::new(8);
        let r = runner("echo foo")
            .run_once(1, &CancellationToken::new(), &bus)
            .await;

        assert!(r.executed);
        assert!(r.is_success());
        assert_eq!(r.stdout, b"foo\n");
        assert!(r.stderr.is_empty());
        assert_eq!(r.exit_code, Some(0));
        assert_eq!(r.attempt, Some(1));
    }

    #[tokio::test]
    async fn captures_stderr_without_failing() {
        let bus = Bus::new(8);
        let r = runner(">&2 echo \"an error\"")
            .run_once(1, &CancellationToken::new(), &bus)
            .await;

        assert!(r.is_success());
        assert_eq!(r.stderr_lossy(), "an error\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_execution_error() {
        let bus = Bus::new(8);
        let r = runner("exit 3")
            .run_once(2, &CancellationToken::new(), &bus)
            .await;

        assert!(r.executed);
        assert!(!r.success);
        assert_eq!(r.exit_code, Some(3));
        assert_eq!(r.error.map(|e| e.to_string()), Some("exit status 3".into()));
    }

    #[tokio::test]
    async fn cancellation_kills_the_process() {
        let bus = Bus::new(8);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let r = runner("sleep 10").run_once(1, &token, &bus).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(r.executed);
        assert!(!r.success);
        assert!(r.is_canceled());
    }

    #[tokio::test]
    async fn publishes_start_and_finish() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        runner("exit 1")
            .run_once(7, &CancellationToken::new(), &bus)
            .await;

        let start = rx.recv().await.expect("start");
        let finish = rx.recv().await.expect("finish");
        assert_eq!(start.kind, EventKind::AttemptStarting);
        assert_eq!(finish.kind, EventKind::AttemptFinished);
        assert_eq!(finish.attempt, Some(7));
        assert_eq!(finish.reason.as_deref(), Some("exit status 1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cpu_times_are_reported_when_enabled() {
        let bus = Bus::new(8);
        let r = runner("exit 0")
            .with_cpu_times(true)
            .run_once(1, &CancellationToken::new(), &bus)
            .await;
        assert!(r.user_time.is_some());
        assert!(r.system_time.is_some());

        let r = runner("exit 0")
            .run_once(1, &CancellationToken::new(), &bus)
            .await;
        assert!(r.user_time.is_none());
    }
}
