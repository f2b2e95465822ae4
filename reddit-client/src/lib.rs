pub mod api;
pub mod auth;

#[cfg(test)]
mod test_server;

pub use api::{RedditApiClient, RedditListing, RedditPostData};
pub use auth::{RedditOAuth2Config, RedditToken};

use async_trait::async_trait;
use flairwatch_core::{CoreError, FeedSource, Item, RedditApiError};
use oauth2::basic::BasicClient;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reddit feed source for one subreddit's `new` listing.
#[derive(Debug)]
pub struct RedditClient {
    config: RedditOAuth2Config,
    subreddit: String,
    label: String,
    http_client: reqwest::Client,
    oauth: BasicClient,
    api: RedditApiClient,
    token: Mutex<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config, subreddit: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let api = RedditApiClient::new(http_client.clone());
        Self::with_api(config, subreddit, http_client, api)
    }

    /// Construct with an explicit API client, e.g. one pointed at another
    /// base URL.
    pub fn with_api(
        config: RedditOAuth2Config,
        subreddit: impl Into<String>,
        http_client: reqwest::Client,
        api: RedditApiClient,
    ) -> Result<Self, CoreError> {
        let subreddit = subreddit.into();
        if subreddit.is_empty() || subreddit.contains('/') {
            return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit,
            }));
        }

        let oauth = auth::oauth_client(&config)?;
        Ok(Self {
            label: format!("r/{}", subreddit),
            config,
            subreddit,
            http_client,
            oauth,
            api,
            token: Mutex::new(None),
        })
    }

    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(&*self.token.lock().await, Some(token) if !token.needs_refresh())
    }

    /// Install a token obtained elsewhere.
    pub async fn set_token(&self, token: RedditToken) {
        *self.token.lock().await = Some(token);
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate_token(&self) {
        if self.token.lock().await.take().is_some() {
            debug!("Cached Reddit token discarded");
        }
    }

    /// Return a usable bearer token, fetching a new one when needed.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.access_token.clone());
            }
            debug!("Reddit token close to expiry, refreshing");
        }

        let token = auth::request_app_token(&self.oauth, &self.http_client).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        info!("Authenticated with Reddit");
        Ok(access_token)
    }

    pub async fn fetch_posts(&self, limit: u32) -> Result<Vec<Item>, CoreError> {
        let access_token = self.access_token().await?;
        match self
            .api
            .get_new_posts(&access_token, &self.subreddit, limit)
            .await
        {
            Ok(listing) => Ok(listing.into_items()),
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!("Reddit rejected the cached token");
                self.invalidate_token().await;
                Err(CoreError::RedditApi(RedditApiError::InvalidToken))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FeedSource for RedditClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Item>, CoreError> {
        self.fetch_posts(limit).await
    }
}
