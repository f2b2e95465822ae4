//! Orderly stop on SIGINT or SIGTERM.

use crate::state::ProcessedState;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Resolves on Ctrl+C, or SIGTERM on Unix.
///
/// If a handler cannot be installed that branch never resolves, so the
/// process keeps running and can still be stopped through the other one.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// The pieces a running service has to wind down.
pub struct ShutdownHandler {
    pub token: CancellationToken,
    pub state: Arc<ProcessedState>,
    pub autosave: JoinHandle<()>,
    pub poller: JoinHandle<()>,
}

impl ShutdownHandler {
    /// Cancel, let the autosave finish its current write, stop the poller
    /// and save once more. Returns whether the final save succeeded.
    pub async fn execute(self) -> bool {
        info!("Shutting down");
        self.token.cancel();

        if let Err(e) = self.autosave.await {
            warn!("Autosave task ended abnormally: {}", e);
        }

        // A fetch or notification still in flight is not waited for, but
        // nothing can mark an id once the poller has stopped
        self.poller.abort();
        match self.poller.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => info!("Poller stopped mid-tick"),
            Err(e) => warn!("Poller task ended abnormally: {}", e),
        }

        let saved = self.state.persist().await;
        if saved {
            info!(
                "Saved {} processed ids to {}",
                self.state.len().await,
                self.state.store().path().display()
            );
        } else {
            error!("Final save failed; recent ids may be notified again");
        }

        saved
    }
}
