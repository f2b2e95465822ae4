//! Boundaries to the outside world.
//!
//! The polling loop only talks to a [`FeedSource`] and a [`Notifier`]; the
//! concrete Reddit client and notification transports live in their own
//! crates and are handed in as trait objects.

use async_trait::async_trait;

use crate::{CoreError, Item};

/// Something that can list the most recent items of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &str;

    /// Fetch up to `limit` of the newest items, newest first.
    ///
    /// Errors for which [`ErrorExt::is_retryable`](crate::ErrorExt::is_retryable)
    /// holds are treated as transient by the caller.
    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Item>, CoreError>;
}

/// A notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one formatted message.
    async fn send(&self, body: &str) -> Result<(), CoreError>;
}
