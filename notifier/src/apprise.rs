use async_trait::async_trait;
use flairwatch_core::{CoreError, Notifier, NotifyError};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

const SERVICE: &str = "Apprise API";

/// Request body understood by the Apprise API `/notify` endpoints.
#[derive(Debug, Serialize)]
struct ApprisePayload<'a> {
    body: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    format: &'a str,
}

impl<'a> ApprisePayload<'a> {
    fn markdown(body: &'a str) -> Self {
        Self {
            body,
            kind: "info",
            format: "markdown",
        }
    }
}

/// Posts notifications to an Apprise API server, which fans them out to
/// whatever services it is configured with.
#[derive(Debug, Clone)]
pub struct AppriseApiNotifier {
    client: Client,
    endpoint: Url,
}

impl AppriseApiNotifier {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for AppriseApiNotifier {
    fn name(&self) -> &str {
        "apprise"
    }

    async fn send(&self, body: &str) -> Result<(), CoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ApprisePayload::markdown(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("{} answered {}: {}", SERVICE, status, message);
            return Err(NotifyError::Rejected {
                service: SERVICE.to_string(),
                status_code: status.as_u16(),
                message,
            }
            .into());
        }

        debug!("{} accepted notification", SERVICE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use flairwatch_core::ErrorExt;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn payload_shape() {
        let payload = serde_json::to_value(ApprisePayload::markdown("hello")).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"body": "hello", "type": "info", "format": "markdown"})
        );
    }

    #[tokio::test]
    async fn posts_json_to_endpoint() {
        let (base, server) = test_server::serve(vec![(200, "{}")]).await;
        let endpoint = Url::parse(&format!("{}/notify/soccer", base)).unwrap();
        let notifier = AppriseApiNotifier::new(test_server::client(), endpoint);

        assert_ok!(notifier.send("Goal\nhttps://clip\n[View on Reddit](https://r)").await);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("POST /notify/soccer "));
        assert!(requests[0].contains(r#""format":"markdown""#));
        assert!(requests[0].contains(r#""body":"Goal\nhttps://clip\n[View on Reddit](https://r)""#));
    }

    #[tokio::test]
    async fn apprise_key_url_reaches_notify_route() {
        let (base, server) = test_server::serve(vec![(200, "{}")]).await;
        let raw = format!("{}/mytoken", base.replacen("http://", "apprise://", 1));
        let endpoint = match crate::NotifyTarget::parse(&raw).unwrap() {
            crate::NotifyTarget::AppriseApi { endpoint } => endpoint,
            other => panic!("unexpected target {:?}", other),
        };
        let notifier = AppriseApiNotifier::new(test_server::client(), endpoint);

        assert_ok!(notifier.send("Goal").await);

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /notify/mytoken "));
    }

    #[tokio::test]
    async fn server_errors_are_retryable_rejections() {
        let (base, server) = test_server::serve(vec![(503, "busy")]).await;
        let notifier = AppriseApiNotifier::new(test_server::client(), Url::parse(&base).unwrap());

        let err = assert_err!(notifier.send("body").await);
        match &err {
            CoreError::Notify(NotifyError::Rejected {
                status_code,
                message,
                ..
            }) => {
                assert_eq!(*status_code, 503);
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_errors_are_final() {
        let (base, server) = test_server::serve(vec![(400, "bad")]).await;
        let notifier = AppriseApiNotifier::new(test_server::client(), Url::parse(&base).unwrap());

        let err = assert_err!(notifier.send("body").await);
        assert!(!err.is_retryable());
        server.await.unwrap();
    }
}
