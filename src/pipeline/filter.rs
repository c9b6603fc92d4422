//! Deduplication and filtering of freshly fetched comments.

use std::collections::HashSet;
use std::fmt;

use crate::models::{Bookmark, Comment};

/// Why a comment was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Ignored,
    AlreadyPosted,
    AlreadySynced,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DropReason::Ignored => "ignored",
            DropReason::AlreadyPosted => "already posted",
            DropReason::AlreadySynced => "already synced",
        };
        f.write_str(reason)
    }
}

/// A dropped comment and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    pub username: String,
    pub reason: DropReason,
}

/// Result of filtering one bookmark's comments.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Comments to deliver, still in page order
    pub survivors: Vec<Comment>,
    /// The bookmark with every newly encountered user marked as seen
    pub bookmark: Bookmark,
    pub drops: Vec<Dropped>,
}

/// Select the comments that are new for `bookmark`.
///
/// A user that is neither ignored nor already seen is marked as seen before
/// the watermark check, so an old comment still claims the user's single
/// delivery slot for this bookmark.
pub fn filter(
    comments: Vec<Comment>,
    ignored: &HashSet<String>,
    bookmark: &Bookmark,
) -> FilterOutcome {
    let mut updated = bookmark.clone();
    let mut survivors = Vec::new();
    let mut drops = Vec::new();

    for comment in comments {
        let reason = if ignored.contains(&comment.username) {
            Some(DropReason::Ignored)
        } else if !updated.seen_users.insert(comment.username.clone()) {
            Some(DropReason::AlreadyPosted)
        } else if comment.posted_at <= bookmark.watermark {
            Some(DropReason::AlreadySynced)
        } else {
            None
        };

        match reason {
            Some(reason) => drops.push(Dropped {
                username: comment.username,
                reason,
            }),
            None => survivors.push(comment),
        }
    }

    FilterOutcome {
        survivors,
        bookmark: updated,
        drops,
    }
}
