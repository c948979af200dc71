//! # Cancellation sources: OS signals and deadlines.
//!
//! A run is cancelled through its [`CancellationToken`]. This module provides
//! the usual ways to trip one from the outside:
//! - [`wait_for_shutdown_signal`]: completes when the process receives a termination signal;
//! - [`cancel_on_signal`]: spawns a watcher that cancels a token on the first signal;
//! - [`cancel_after`]: spawns a watcher that cancels a token once a deadline passes.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancels `token` on the first termination signal.
///
/// The watcher exits without cancelling if the token is cancelled by someone
/// else first. The handle resolves to `true` when a signal was the cause.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            res = wait_for_shutdown_signal() => match res {
                Ok(()) => {
                    tracing::debug!("termination signal received");
                    token.cancel();
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "signal registration failed");
                    false
                }
            },
        }
    })
}

/// Cancels `token` once `deadline` has elapsed.
///
/// The handle resolves to `true` when the deadline was the cause.
pub fn cancel_after(token: CancellationToken, deadline: Duration) -> JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(deadline) => {
                tracing::debug!(?deadline, "deadline reached");
                token.cancel();
                true
            }
        }
    })
}
