//! The long-running side of flairwatch: polling, deduplication state,
//! autosave and shutdown.

pub mod autosave;
pub mod poller;
pub mod shutdown;
pub mod state;
pub mod store;

pub use poller::{select_deliverable, Poller, PollerSettings, TickReport};
pub use shutdown::{shutdown_signal, ShutdownHandler};
pub use state::ProcessedState;
pub use store::{ProcessedSet, StateStore};

use flairwatch_core::{AppConfig, FeedSource, Notifier};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub processed_posts_file: PathBuf,
    pub autosave_interval: Duration,
    pub poller: PollerSettings,
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            processed_posts_file: config.processed_posts_file.clone(),
            autosave_interval: config.autosave_interval,
            poller: PollerSettings::from(config),
        }
    }
}

pub struct BackgroundService {
    autosave_interval: Duration,
    state: Arc<ProcessedState>,
    poller: Arc<Poller>,
    token: CancellationToken,
}

impl BackgroundService {
    /// Loads the processed set from disk; a missing or broken file starts
    /// the service with an empty set.
    pub fn new(
        config: ServiceConfig,
        source: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = Arc::new(ProcessedState::load(StateStore::new(
            config.processed_posts_file,
        )));
        let poller = Arc::new(Poller::new(
            source,
            notifier,
            Arc::clone(&state),
            config.poller,
        ));

        Self {
            autosave_interval: config.autosave_interval,
            state,
            poller,
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> &Arc<ProcessedState> {
        &self.state
    }

    /// Cancelling this token stops the service as if a signal had arrived.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Run until SIGINT or SIGTERM. Returns whether the final save succeeded.
    pub async fn run(self) -> bool {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `trigger` resolves or the shutdown token is cancelled.
    pub async fn run_until<F>(self, trigger: F) -> bool
    where
        F: Future<Output = ()>,
    {
        info!("Starting background service");

        let autosave = autosave::spawn_autosave(
            Arc::clone(&self.state),
            self.autosave_interval,
            self.token.clone(),
        );
        let poller = {
            let poller = Arc::clone(&self.poller);
            let token = self.token.clone();
            tokio::spawn(async move { poller.run(token).await })
        };

        tokio::select! {
            _ = trigger => info!("Shutdown requested"),
            _ = self.token.cancelled() => info!("Shutdown token cancelled"),
        }

        ShutdownHandler {
            token: self.token,
            state: self.state,
            autosave,
            poller,
        }
        .execute()
        .await
    }
}
