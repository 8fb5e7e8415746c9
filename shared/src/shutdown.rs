use std::time::Duration;

use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Maximum time to wait for in-flight dispatches during graceful shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for Ctrl+C or SIGTERM, then returns to trigger graceful shutdown.
///
/// # Panics
///
/// Panics if the Ctrl+C or SIGTERM signal handler cannot be installed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}

/// Closes `tracker` and waits up to `timeout` for its tasks. On timeout,
/// cancels `cancel` so outstanding backend requests abort, and returns `false`.
pub async fn drain_tasks(
    tracker: &TaskTracker,
    cancel: &CancellationToken,
    timeout: Duration,
) -> bool {
    tracker.close();
    tracing::info!(pending = tracker.len(), "Waiting for background tasks to finish...");

    if tokio::time::timeout(timeout, tracker.wait()).await.is_ok() {
        return true;
    }

    tracing::warn!("Shutdown timeout reached, cancelling outstanding backend requests");
    cancel.cancel();
    false
}
