//! Notification transports.
//!
//! A single notification URL picks the transport; see [`NotifyTarget`] for
//! the accepted forms.

pub mod apprise;
pub mod desktop;
pub mod target;
pub mod telegram;

#[cfg(test)]
mod test_server;

pub use apprise::AppriseApiNotifier;
pub use desktop::DesktopNotifier;
pub use target::NotifyTarget;
pub use telegram::TelegramNotifier;

use flairwatch_core::{CoreError, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const APP_NAME: &str = "flairwatch";

/// Parse a notification URL and build the matching notifier.
pub fn from_url(url: &str) -> Result<Arc<dyn Notifier>, CoreError> {
    build(NotifyTarget::parse(url)?)
}

pub fn build(target: NotifyTarget) -> Result<Arc<dyn Notifier>, CoreError> {
    info!("Notifications go to {}", target.describe());

    let notifier: Arc<dyn Notifier> = match target {
        NotifyTarget::AppriseApi { endpoint } => {
            Arc::new(AppriseApiNotifier::new(http_client()?, endpoint))
        }
        NotifyTarget::Telegram { bot_token, chat_id } => {
            Arc::new(TelegramNotifier::new(http_client()?, bot_token, chat_id))
        }
        NotifyTarget::Desktop => Arc::new(DesktopNotifier::new(APP_NAME)),
    };
    Ok(notifier)
}

fn http_client() -> Result<reqwest::Client, CoreError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("flairwatch/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flairwatch_core::NotifyError;

    #[test]
    fn picks_transport_by_scheme() {
        assert_eq!(from_url("apprise://apprise:8000/soccer").unwrap().name(), "apprise");
        assert_eq!(from_url("tgram://1:abc/42").unwrap().name(), "telegram");
        assert_eq!(from_url("desktop://").unwrap().name(), "desktop");
    }

    #[test]
    fn unknown_scheme_fails_construction() {
        let result = from_url("smtp://mail.example.com");
        assert!(matches!(
            result,
            Err(CoreError::Notify(NotifyError::UnsupportedScheme { .. }))
        ));
    }
}
