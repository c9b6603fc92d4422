//! Tracked bookmark record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::url::entry_url;

/// An article whose comment thread is relayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    /// Canonical article URL, the identifying key
    pub url: String,

    /// Timestamp of the most recently delivered comment
    #[serde(default = "default_watermark")]
    pub watermark: DateTime<Utc>,

    /// Usernames already delivered for this bookmark
    #[serde(default)]
    pub seen_users: BTreeSet<String>,
}

/// Watermark of a bookmark that has never been synced.
pub fn default_watermark() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl Bookmark {
    /// Start tracking a new article.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            watermark: default_watermark(),
            seen_users: BTreeSet::new(),
        }
    }

    /// URL of the comment page on the bookmarking site.
    pub fn comment_page_url(&self, site_base: &str) -> Result<String> {
        entry_url(site_base, &self.url)
    }

    /// Whether this bookmark has ever delivered a comment.
    pub fn is_synced(&self) -> bool {
        self.watermark > default_watermark()
    }
}
