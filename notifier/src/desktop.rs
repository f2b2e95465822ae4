use async_trait::async_trait;
use flairwatch_core::{CoreError, Notifier, NotifyError};
use notify_rust::Notification;
use std::time::Duration;
use tracing::debug;

/// Upper bound for handing one notification to the desktop daemon.
const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

/// Shows notifications on the local desktop (D-Bus on Linux).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

/// The first line becomes the summary, the rest the body.
fn split_message(body: &str) -> (&str, &str) {
    match body.split_once('\n') {
        Some((summary, rest)) => (summary, rest),
        None => (body, ""),
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn send(&self, body: &str) -> Result<(), CoreError> {
        let (summary, text) = split_message(body);
        let app_name = self.app_name.clone();
        let summary = summary.to_string();
        let text = text.to_string();

        // The D-Bus call blocks
        let shown = tokio::task::spawn_blocking(move || {
            Notification::new()
                .appname(&app_name)
                .summary(&summary)
                .body(&text)
                .show()
                .map(|_| ())
                .map_err(|e| e.to_string())
        });

        tokio::time::timeout(SHOW_TIMEOUT, shown)
            .await
            .map_err(|_| CoreError::Timeout {
                seconds: SHOW_TIMEOUT.as_secs(),
            })?
            .map_err(|e| CoreError::Internal {
                message: format!("desktop notification task failed: {}", e),
            })?
            .map_err(|reason| NotifyError::Desktop { reason })?;

        debug!("Desktop notification shown");
        Ok(())
    }
}
