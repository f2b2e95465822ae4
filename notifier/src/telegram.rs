use async_trait::async_trait;
use flairwatch_core::{CoreError, Notifier, NotifyError};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const SERVICE: &str = "Telegram";

/// Telegram Bot API notifier.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base(client, TELEGRAM_API_BASE, bot_token, chat_id)
    }

    pub fn with_api_base(
        client: Client,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    async fn send_message(
        &self,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), CoreError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode);
        }

        // The URL carries the bot token, so keep it out of the error
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                service: SERVICE.to_string(),
                status_code: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, body: &str) -> Result<(), CoreError> {
        match self.send_message(body, Some("Markdown")).await {
            Ok(()) => {
                debug!("Telegram message sent to {}", self.chat_id);
                Ok(())
            }
            // Titles with stray `_` or `*` break Markdown entity parsing
            Err(CoreError::Notify(NotifyError::Rejected {
                status_code,
                message,
                ..
            })) if status_code == StatusCode::BAD_REQUEST.as_u16() => {
                warn!(
                    "Telegram refused Markdown ({}), resending as plain text",
                    message
                );
                self.send_message(body, None).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use flairwatch_core::ErrorExt;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn sends_markdown_message() {
        let (base, server) = test_server::serve(vec![(200, r#"{"ok":true}"#)]).await;
        let notifier = TelegramNotifier::with_api_base(test_server::client(), base, "123:abc", "42");

        assert_ok!(notifier.send("*Goal*").await);

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /bot123:abc/sendMessage "));
        assert!(requests[0].contains(r#""parse_mode":"Markdown""#));
        assert!(requests[0].contains(r#""chat_id":"42""#));
    }

    #[tokio::test]
    async fn falls_back_to_plain_text_on_bad_request() {
        let (base, server) = test_server::serve(vec![
            (400, r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#),
            (200, r#"{"ok":true}"#),
        ])
        .await;
        let notifier = TelegramNotifier::with_api_base(test_server::client(), base, "123:abc", "42");

        assert_ok!(notifier.send("snake_case_title").await);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].contains("parse_mode"));
        assert!(!requests[1].contains("parse_mode"));
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let (base, server) = test_server::serve(vec![(429, r#"{"ok":false}"#)]).await;
        let notifier = TelegramNotifier::with_api_base(test_server::client(), base, "123:abc", "42");

        let err = assert_err!(notifier.send("hello").await);
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "NOTIFY");
        server.await.unwrap();
    }
}
