//! The fetch, filter and deliver loop.

use crate::state::ProcessedState;
use crate::store::ProcessedSet;
use flairwatch_core::{AppConfig, CoreError, ErrorExt, FeedSource, Item, Notifier, RetryPolicy};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_DELIVERY_GAP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub fetch_limit: u32,
    /// Lower-case keyword the flair must contain
    pub flair_keyword: String,
    pub poll_interval: Duration,
    /// Pause after a failed tick, used instead of the poll interval
    pub error_delay: Duration,
    /// Pause between two deliveries within one tick
    pub delivery_gap: Duration,
    pub fetch_retry: RetryPolicy,
    pub notify_retry: RetryPolicy,
}

impl PollerSettings {
    pub fn new(flair_keyword: impl Into<String>, poll_interval: Duration, fetch_limit: u32) -> Self {
        Self {
            fetch_limit,
            flair_keyword: flair_keyword.into().to_lowercase(),
            poll_interval,
            error_delay: DEFAULT_ERROR_DELAY,
            delivery_gap: DEFAULT_DELIVERY_GAP,
            fetch_retry: RetryPolicy::fetch(),
            notify_retry: RetryPolicy::notify(),
        }
    }
}

impl From<&AppConfig> for PollerSettings {
    fn from(config: &AppConfig) -> Self {
        Self::new(
            config.flair_keyword.clone(),
            config.poll_interval,
            config.fetch_limit,
        )
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Cancellation stopped the tick before every match was handled
    pub interrupted: bool,
}

/// Items that still need a notification, oldest first.
///
/// `items` comes newest first from the feed. Processed ids and items whose
/// flair does not contain `keyword` are dropped, as are repeats within the
/// batch.
pub fn select_deliverable(items: Vec<Item>, processed: &ProcessedSet, keyword: &str) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut selected: Vec<Item> = items
        .into_iter()
        .filter(|item| !processed.contains(&item.id) && item.flair_matches(keyword))
        .filter(|item| seen.insert(item.id.clone()))
        .collect();
    selected.reverse();
    selected
}

/// Sleep for `duration` unless cancelled first. Returns false on
/// cancellation.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

pub struct Poller {
    source: Arc<dyn FeedSource>,
    notifier: Arc<dyn Notifier>,
    state: Arc<ProcessedState>,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(
        source: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        state: Arc<ProcessedState>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            notifier,
            state,
            settings,
        }
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// One fetch, filter and deliver cycle.
    ///
    /// A fetch that still fails after its retries aborts the tick. A
    /// notification that still fails is logged and its item is marked
    /// processed anyway, so one bad item cannot block the feed.
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, CoreError> {
        let mut report = TickReport::default();
        let limit = self.settings.fetch_limit;

        let items = self
            .settings
            .fetch_retry
            .execute("fetch_recent", || self.source.fetch_recent(limit))
            .await?;
        report.fetched = items.len();

        let keyword = self.settings.flair_keyword.as_str();
        let deliverable = self
            .state
            .with_set(|processed| select_deliverable(items, processed, keyword))
            .await;
        report.matched = deliverable.len();

        for (position, item) in deliverable.iter().enumerate() {
            if position > 0 && !pause(self.settings.delivery_gap, cancel).await {
                report.interrupted = true;
                break;
            }
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let body = item.notification_body();
            match self
                .settings
                .notify_retry
                .execute("notify", || self.notifier.send(&body))
                .await
            {
                Ok(()) => {
                    report.delivered += 1;
                    info!(id = %item.id, "Notified: {}", item.title);
                }
                Err(e) => {
                    report.failed += 1;
                    e.log_error();
                    warn!(id = %item.id, "Dropping notification for {}", item.title);
                }
            }

            self.state.mark_processed(&item.id).await;
        }

        Ok(report)
    }

    /// Tick until `cancel` fires. Errors and panics inside a tick are logged
    /// and followed by the error delay.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Polling {} every {:?} for flair containing '{}', notifying via {}",
            self.source.name(),
            self.settings.poll_interval,
            self.settings.flair_keyword,
            self.notifier.name()
        );

        while !cancel.is_cancelled() {
            let delay = match AssertUnwindSafe(self.tick(&cancel)).catch_unwind().await {
                Ok(Ok(report)) => {
                    log_report(&report);
                    self.settings.poll_interval
                }
                Ok(Err(e)) => {
                    e.log_error();
                    error!("Poll of {} failed: {:?}", self.source.name(), e);
                    self.settings.error_delay
                }
                Err(panic) => {
                    error!("Poll of {} panicked: {}", self.source.name(), panic_message(&*panic));
                    self.settings.error_delay
                }
            };

            if !pause(delay, &cancel).await {
                break;
            }
        }

        info!("Poller stopped");
    }
}

fn log_report(report: &TickReport) {
    if report.matched > 0 || report.interrupted {
        info!(
            fetched = report.fetched,
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            interrupted = report.interrupted,
            "Tick finished"
        );
    } else {
        debug!(fetched = report.fetched, "Tick finished, nothing new");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, flair: Option<&str>) -> Item {
        Item {
            id: id.to_string(),
            title: format!("Post {}", id),
            url: format!("https://example.com/{}", id),
            permalink: format!("https://www.reddit.com/r/soccer/comments/{}/", id),
            flair: flair.map(str::to_string),
            created: None,
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn selects_matching_unprocessed_oldest_first() {
        let items = vec![
            item("3", Some("Media")),
            item("2", Some("Discussion")),
            item("1", Some("Media")),
        ];
        let selected = select_deliverable(items, &ProcessedSet::new(), "media");
        assert_eq!(ids(&selected), vec!["1", "3"]);
    }

    #[test]
    fn skips_processed_ids() {
        let items = vec![item("c", Some("Media")), item("b", Some("Media"))];
        let processed: ProcessedSet = ["b"].into_iter().collect();
        assert_eq!(ids(&select_deliverable(items, &processed, "media")), vec!["c"]);
    }

    #[test]
    fn flair_match_is_case_insensitive_containment() {
        let items = vec![
            item("d", Some("MEDIA - Goal")),
            item("c", Some("Social Media")),
            item("b", Some("Med")),
            item("a", None),
        ];
        assert_eq!(
            ids(&select_deliverable(items, &ProcessedSet::new(), "media")),
            vec!["c", "d"]
        );
    }

    #[test]
    fn empty_keyword_matches_everything() {
        let items = vec![item("b", None), item("a", Some("Anything"))];
        assert_eq!(
            ids(&select_deliverable(items, &ProcessedSet::new(), "")),
            vec!["a", "b"]
        );
    }

    #[test]
    fn repeated_ids_in_one_batch_are_delivered_once() {
        let items = vec![item("x", Some("Media")), item("x", Some("Media"))];
        assert_eq!(ids(&select_deliverable(items, &ProcessedSet::new(), "media")), vec!["x"]);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }

    #[tokio::test]
    async fn pause_stops_early_on_cancel() {
        let cancel = CancellationToken::new();
        assert!(pause(Duration::from_millis(1), &cancel).await);

        cancel.cancel();
        assert!(!pause(Duration::from_secs(60), &cancel).await);
    }

    #[test]
    fn settings_lowercase_keyword() {
        let settings = PollerSettings::new("MeDiA", Duration::from_secs(5), 20);
        assert_eq!(settings.flair_keyword, "media");
        assert_eq!(settings.fetch_retry, RetryPolicy::fetch());
        assert_eq!(settings.notify_retry, RetryPolicy::notify());
        assert_eq!(settings.error_delay, DEFAULT_ERROR_DELAY);
    }
}
