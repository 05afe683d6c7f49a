// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the HTTP server and the assignment sweep
//! monitor. Background tasks are then drained with a deadline.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits for background tasks to finish, up to `timeout` in total.
///
/// Returns the number of tasks that did not finish in time; those are aborted.
pub async fn drain_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>, timeout: Duration) -> usize {
    if tasks.is_empty() {
        info!("no background tasks to drain");
        return 0;
    }

    let deadline = tokio::time::Instant::now() + timeout;
    let mut interrupted = 0;
    for (name, mut handle) in tasks {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => debug!(task = name, "background task finished"),
            Ok(Err(e)) => warn!(task = name, error = %e, "background task ended abnormally"),
            Err(_) => {
                handle.abort();
                interrupted += 1;
                warn!(task = name, "timeout reached, background task interrupted");
            }
        }
    }
    if interrupted == 0 {
        info!("all background tasks drained");
    }
    interrupted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_task_list() {
        assert_eq!(drain_tasks(Vec::new(), Duration::from_millis(10)).await, 0);
    }

    #[tokio::test]
    async fn drain_waits_for_cancelled_tasks() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let task = tokio::spawn(async move { child.cancelled().await });
        cancel.cancel();
        assert_eq!(drain_tasks(vec![("sweep", task)], Duration::from_secs(1)).await, 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn drain_aborts_stuck_tasks() {
        let task = tokio::spawn(async { std::future::pending::<()>().await });
        assert_eq!(drain_tasks(vec![("stuck", task)], Duration::from_millis(20)).await, 1);
        assert!(logs_contain("background task interrupted"));
    }
}
