//! Storage abstractions for bookmark persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Relay configuration
//! ├── bookmarks.json        # Tracked bookmarks with sync progress
//! └── ignored_users.json    # Usernames never relayed
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Bookmark;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for bookmark storage backends.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// All tracked bookmarks, in storage order.
    async fn list(&self) -> Result<Vec<Bookmark>>;

    /// Insert or replace a bookmark, keyed by URL.
    async fn save(&self, bookmark: &Bookmark) -> Result<()>;

    /// Stop tracking a bookmark.
    async fn remove(&self, bookmark: &Bookmark) -> Result<()>;

    /// Usernames excluded from delivery.
    async fn list_ignored_usernames(&self) -> Result<Vec<String>>;

    /// Add a username to the ignore list.
    async fn ignore(&self, username: &str) -> Result<()>;
}
