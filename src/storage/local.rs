//! Local filesystem storage implementation.
//!
//! Bookmarks and the ignore list are kept as pretty-printed JSON arrays.
//! Every write goes to a temp file first and is renamed into place.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Bookmark;
use crate::storage::BookmarkStore;

const BOOKMARKS_KEY: &str = "bookmarks.json";
const IGNORED_KEY: &str = "ignored_users.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_bookmarks(&self) -> Result<Vec<Bookmark>> {
        Ok(self.read_json(BOOKMARKS_KEY).await?.unwrap_or_default())
    }
}

#[async_trait]
impl BookmarkStore for LocalStorage {
    async fn list(&self) -> Result<Vec<Bookmark>> {
        let bookmarks = self.load_bookmarks().await?;
        if bookmarks.is_empty() {
            log::warn!("No bookmarks found in {}", self.path(BOOKMARKS_KEY).display());
        }
        Ok(bookmarks)
    }

    async fn save(&self, bookmark: &Bookmark) -> Result<()> {
        let mut bookmarks = self.load_bookmarks().await?;
        match bookmarks.iter_mut().find(|b| b.url == bookmark.url) {
            Some(existing) => *existing = bookmark.clone(),
            None => bookmarks.push(bookmark.clone()),
        }
        self.write_json(BOOKMARKS_KEY, &bookmarks).await
    }

    async fn remove(&self, bookmark: &Bookmark) -> Result<()> {
        let mut bookmarks = self.load_bookmarks().await?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.url != bookmark.url);
        if bookmarks.len() == before {
            return Err(AppError::persistence(&bookmark.url, "bookmark not found"));
        }
        self.write_json(BOOKMARKS_KEY, &bookmarks).await
    }

    async fn list_ignored_usernames(&self) -> Result<Vec<String>> {
        Ok(self.read_json(IGNORED_KEY).await?.unwrap_or_default())
    }

    async fn ignore(&self, username: &str) -> Result<()> {
        let mut ignored = self.list_ignored_usernames().await?;
        if !ignored.iter().any(|u| u == username) {
            ignored.push(username.to_string());
            self.write_json(IGNORED_KEY, &ignored).await?;
        }
        Ok(())
    }
}
