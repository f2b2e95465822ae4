use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single feed entry as delivered by a [`FeedSource`](crate::FeedSource).
///
/// Identity is the `id`; everything else is display data for the
/// notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    /// Link the post points at (external media or the post itself).
    pub url: String,
    /// Absolute link to the discussion page.
    pub permalink: String,
    pub flair: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Item {
    /// True when the lower-cased flair contains the lower-cased keyword.
    ///
    /// Items without flair are treated as having an empty flair, so they only
    /// match an empty keyword.
    pub fn flair_matches(&self, keyword: &str) -> bool {
        self.flair
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }

    /// Message body handed to the notifier: title, link, then a markdown
    /// link back to the discussion.
    pub fn notification_body(&self) -> String {
        format!(
            "{}\n{}\n[View on Reddit]({})",
            self.title, self.url, self.permalink
        )
    }
}
