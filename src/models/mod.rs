// src/models/mod.rs

//! Domain models for the relay.

mod bookmark;
mod comment;
mod config;

// Re-export all public types
pub use bookmark::{Bookmark, default_watermark};
pub use comment::{Comment, Message, RawComment};
pub use config::{
    CommentSelectors, Config, HttpConfig, SinkConfig, SourceConfig, SyncConfig, WEBHOOK_URL_ENV,
};
