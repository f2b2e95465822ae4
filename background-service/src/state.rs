use crate::store::{ProcessedSet, StateStore};
use tokio::sync::Mutex;
use tracing::error;

/// The in-memory processed set shared by the poller and the autosave task,
/// together with the store it is persisted to.
///
/// Every access goes through the mutex. Persisting keeps the lock held until
/// the file is written, so saves never interleave and never observe a
/// half-applied update.
#[derive(Debug)]
pub struct ProcessedState {
    set: Mutex<ProcessedSet>,
    store: StateStore,
}

impl ProcessedState {
    pub fn new(store: StateStore, set: ProcessedSet) -> Self {
        Self {
            set: Mutex::new(set),
            store,
        }
    }

    /// Start from whatever the store currently holds.
    pub fn load(store: StateStore) -> Self {
        let set = store.load();
        Self::new(store, set)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run `f` against the set under the lock.
    pub async fn with_set<R>(&self, f: impl FnOnce(&ProcessedSet) -> R) -> R {
        let set = self.set.lock().await;
        f(&set)
    }

    pub async fn mark_processed(&self, id: &str) -> bool {
        self.set.lock().await.insert(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.set.lock().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.set.lock().await.len()
    }

    pub async fn snapshot(&self) -> ProcessedSet {
        self.set.lock().await.clone()
    }

    /// Write the current set to the store. Failures are logged and reported
    /// as `false`; the in-memory set is never touched.
    pub async fn persist(&self) -> bool {
        let guard = self.set.lock().await;
        let set = guard.clone();
        let store = self.store.clone();

        let written = tokio::task::spawn_blocking(move || store.save(&set)).await;
        drop(guard);

        match written {
            Ok(saved) => saved,
            Err(e) => {
                error!("State save task failed: {}", e);
                false
            }
        }
    }
}
