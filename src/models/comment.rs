//! Comment and outbound message structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment as scraped from the entry page, before its timestamp is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    pub username: String,
    pub avatar_url: String,
    pub text: String,
    /// Absolute URL of the comment's own page
    pub permalink: String,
}

impl RawComment {
    /// Attach the resolved timestamp.
    pub fn resolved(self, posted_at: DateTime<Utc>) -> Comment {
        Comment {
            username: self.username,
            avatar_url: self.avatar_url,
            text: self.text,
            permalink: self.permalink,
            posted_at,
        }
    }
}

/// A comment with its precise posting time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub username: String,
    pub avatar_url: String,
    pub text: String,
    pub permalink: String,
    pub posted_at: DateTime<Utc>,
}

impl Comment {
    /// Format the comment into a chat message using a template.
    ///
    /// Supported placeholders:
    /// - `{username}`, `{text}`, `{permalink}`
    /// - `{posted_at}` (RFC 3339), `{bookmark_url}`
    pub fn to_message(&self, template: &str, bookmark_url: &str) -> Message {
        let body = template
            .replace("{username}", &self.username)
            .replace("{permalink}", &self.permalink)
            .replace("{posted_at}", &self.posted_at.to_rfc3339())
            .replace("{bookmark_url}", bookmark_url)
            .replace("{text}", &self.text);

        Message {
            display_name: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            body,
        }
    }
}

/// A message handed to the notification sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub display_name: String,
    pub avatar_url: String,
    pub body: String,
}
