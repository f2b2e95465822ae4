use chrono::{DateTime, Utc};
use flairwatch_core::{CoreError, Item, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// The subset of a submission's fields the bridge reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub url: String,
    pub permalink: String,
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_utc: f64,
}

impl RedditListing<RedditPostData> {
    /// Posts in listing order (newest first for `/new`).
    pub fn into_items(self) -> Vec<Item> {
        self.data
            .children
            .into_iter()
            .map(|child| Item::from(child.data))
            .collect()
    }
}

impl From<RedditPostData> for Item {
    fn from(post_data: RedditPostData) -> Self {
        let permalink = if post_data.permalink.starts_with('/') {
            format!("{}{}", REDDIT_WEB_BASE, post_data.permalink)
        } else {
            post_data.permalink
        };

        Self {
            id: post_data.id,
            title: post_data.title,
            url: post_data.url,
            permalink,
            flair: post_data.link_flair_text.filter(|f| !f.is_empty()),
            created: DateTime::<Utc>::from_timestamp(post_data.created_utc as i64, 0)
                .filter(|_| post_data.created_utc > 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(http_client: Client) -> Self {
        Self::with_base_url(http_client, REDDIT_API_BASE)
    }

    pub fn with_base_url(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(
                "Request successful: {} {} in {:?}",
                status,
                endpoint,
                start_time.elapsed()
            );
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::InvalidResponse {
                details: format!("Resource not found: {}", endpoint),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => {
                return Err(CoreError::RequestFailed {
                    message: format!("{} {} returned {}", method, endpoint, status),
                    status_code: Some(code),
                })
            }
        };
        Err(CoreError::RedditApi(error))
    }

    /// `GET /r/{subreddit}/new`
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params))
            .await
            .map_err(|e| match e {
                // Reddit answers 404 for unknown or banned subreddits
                CoreError::RedditApi(RedditApiError::InvalidResponse { .. }) => {
                    CoreError::RedditApi(RedditApiError::SubredditNotFound {
                        subreddit: subreddit.to_string(),
                    })
                }
                other => other,
            })?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}
