//! Bookmark lifecycle: persist progress or retire stale bookmarks.
//!
//! ```text
//! survivors > 0 ──► Active   save {watermark, seen_users}
//! survivors = 0 ──► Stale    save {seen_users}
//!                    │
//!                    └─ now > watermark + retention ──► Retired   save, then remove
//! ```

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AppError;
use crate::models::Bookmark;
use crate::storage::BookmarkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// New comments were found; the watermark advances
    Active,
    /// Nothing new, still inside the retention window
    Stale,
    /// Nothing new for longer than the retention window
    Retired,
}

/// Outcome of evaluating one bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: LifecycleState,
    /// Snapshot to persist
    pub bookmark: Bookmark,
}

/// Decide what happens to a bookmark after filtering and ordering.
///
/// `bookmark` is the filtered snapshot (seen users already grown).
pub fn transition(
    mut bookmark: Bookmark,
    survivor_count: usize,
    new_watermark: DateTime<Utc>,
    now: DateTime<Utc>,
    retention_days: i64,
) -> Transition {
    if survivor_count > 0 {
        bookmark.watermark = bookmark.watermark.max(new_watermark);
        return Transition {
            state: LifecycleState::Active,
            bookmark,
        };
    }

    let expired = TimeDelta::try_days(retention_days)
        .and_then(|window| bookmark.watermark.checked_add_signed(window))
        .is_some_and(|limit| now > limit);

    Transition {
        state: if expired {
            LifecycleState::Retired
        } else {
            LifecycleState::Stale
        },
        bookmark,
    }
}

/// Persist a transition. Failures are logged and returned, never raised.
///
/// The bookmark is always saved so grown seen users survive even without
/// survivors. Removal is attempted for retired bookmarks even when the save
/// failed.
pub async fn apply(store: &dyn BookmarkStore, transition: &Transition) -> Vec<AppError> {
    let bookmark = &transition.bookmark;
    let mut failures = Vec::new();

    if let Err(e) = store.save(bookmark).await {
        failures.push(persistence_error(&bookmark.url, e));
    }

    if transition.state == LifecycleState::Retired {
        match store.remove(bookmark).await {
            Ok(()) => log::info!(
                "Retired {} (no new comments since {})",
                bookmark.url,
                bookmark.watermark
            ),
            Err(e) => failures.push(persistence_error(&bookmark.url, e)),
        }
    }

    failures
}

fn persistence_error(url: &str, error: AppError) -> AppError {
    let error = match error {
        e @ AppError::Persistence { .. } => e,
        other => AppError::persistence(url, other),
    };
    log::error!("{}", error);
    error
}
