//! Signal-driven cooperative shutdown
//!
//! SIGINT (and SIGTERM on unix) cancel the crawl's [`CancellationToken`].
//! The coordinator stops claiming batches; batches already handed to workers
//! are finished, and anything left in-flight is recovered on the next resume.

use std::future::Future;
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a task that cancels `token` on the first termination signal
///
/// The task also ends quietly when the token is cancelled elsewhere.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::info!("Shutdown requested; finishing batches already handed out");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = delivered("SIGINT", tokio::signal::ctrl_c()) => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Could not install SIGTERM handler: {}", e);
            delivered("SIGINT", tokio::signal::ctrl_c()).await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    delivered("SIGINT", tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` reports a delivery
///
/// A handler that could not be installed never resolves, so it cannot be
/// mistaken for a shutdown request.
async fn delivered<F>(name: &str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!("Could not listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}
