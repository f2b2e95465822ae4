use crate::state::ProcessedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Persist `state` every `period`, starting right away, until `cancel`
/// fires. A save in progress always runs to completion.
pub async fn run_autosave(state: Arc<ProcessedState>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "Autosaving to {} every {:?}",
        state.store().path().display(),
        period
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if state.persist().await {
                    debug!("Autosave complete");
                } else {
                    warn!("Autosave failed, retrying next period");
                }
            }
        }
    }

    debug!("Autosave stopped");
}

pub fn spawn_autosave(
    state: Arc<ProcessedState>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_autosave(state, period, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProcessedSet, StateStore};
    use tempfile::tempdir;

    #[tokio::test]
    async fn saves_immediately_and_on_each_period() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = Arc::new(ProcessedState::new(
            store.clone(),
            ["a"].into_iter().collect::<ProcessedSet>(),
        ));
        let cancel = CancellationToken::new();

        let handle = spawn_autosave(Arc::clone(&state), Duration::from_millis(20), cancel.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.load().len(), 1);

        state.mark_processed("b").await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.load().len(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let dir = tempdir().unwrap();
        let state = Arc::new(ProcessedState::new(
            StateStore::new(dir.path().join("state.json")),
            ProcessedSet::new(),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let handle = spawn_autosave(state, Duration::from_secs(3600), cancel);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
