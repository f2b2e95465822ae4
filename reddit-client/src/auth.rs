//! Application-only OAuth2 for Reddit.
//!
//! The bridge never acts on behalf of a user, so it uses the
//! client-credentials grant and keeps the bearer token until shortly before
//! it expires.

use flairwatch_core::{CoreError, RedditApiError};
use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError, TokenResponse,
    TokenUrl,
};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are refreshed this long before Reddit would reject them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Used when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub token_url: String,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
            token_url: REDDIT_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    /// True once the token is within the refresh margin of its expiry.
    pub fn needs_refresh(&self) -> bool {
        match self.expires_at.duration_since(SystemTime::now()) {
            Ok(remaining) => remaining <= EXPIRY_MARGIN,
            Err(_) => true,
        }
    }
}

/// Builds the oauth2 client for the client-credentials exchange.
pub fn oauth_client(config: &RedditOAuth2Config) -> Result<BasicClient, CoreError> {
    let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(invalid_url)?;
    let token_url = TokenUrl::new(config.token_url.clone()).map_err(invalid_url)?;

    Ok(BasicClient::new(
        ClientId::new(config.client_id.clone()),
        Some(ClientSecret::new(config.client_secret.clone())),
        auth_url,
        Some(token_url),
    ))
}

fn invalid_url(e: oauth2::url::ParseError) -> CoreError {
    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: format!("invalid OAuth endpoint: {}", e),
    })
}

/// Run the client-credentials grant through our own reqwest client, so the
/// request carries the configured User-Agent that Reddit insists on.
pub async fn request_app_token(
    oauth: &BasicClient,
    http_client: &reqwest::Client,
) -> Result<RedditToken, CoreError> {
    info!("Requesting application-only Reddit token");

    let response = oauth
        .exchange_client_credentials()
        .request_async(|request| send_oauth_request(http_client.clone(), request))
        .await
        .map_err(|e| {
            error!("Reddit token request failed: {}", e);
            match e {
                RequestTokenError::Request(source) if source.is_timeout() => {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                }
                RequestTokenError::Request(source) => CoreError::Network(source),
                RequestTokenError::ServerResponse(body) => {
                    let reason = match body.error() {
                        BasicErrorResponseType::InvalidClient => {
                            "invalid client credentials".to_string()
                        }
                        other => other.to_string(),
                    };
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
                }
                RequestTokenError::Parse(source, _) => {
                    CoreError::RedditApi(RedditApiError::InvalidResponse {
                        details: format!("token response: {}", source),
                    })
                }
                RequestTokenError::Other(message) => {
                    CoreError::RedditApi(RedditApiError::InvalidResponse { details: message })
                }
            }
        })?;

    let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
    debug!("Reddit token valid for {:?}", lifetime);

    Ok(RedditToken {
        access_token: response.access_token().secret().to_string(),
        expires_at: SystemTime::now() + lifetime,
    })
}

async fn send_oauth_request(
    client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
