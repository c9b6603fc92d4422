// src/error.rs

//! Unified error handling for the relay.

use std::fmt;

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bookmark URL does not look like `http(s)://...`
    #[error("Malformed bookmark URL: {0}")]
    MalformedUrl(String),

    /// Timestamp lookup for a single comment failed
    #[error("Failed to resolve comment {permalink}: {message}")]
    CommentResolution { permalink: String, message: String },

    /// Notification sink could not be reached
    #[error("Delivery failed for {username}: {message}")]
    SinkDelivery { username: String, message: String },

    /// Bookmark store save/remove failed
    #[error("Persistence error for {url}: {message}")]
    Persistence { url: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed URL error.
    pub fn malformed_url(url: impl Into<String>) -> Self {
        Self::MalformedUrl(url.into())
    }

    /// Create a per-comment resolution error.
    pub fn resolution(permalink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CommentResolution {
            permalink: permalink.into(),
            message: message.to_string(),
        }
    }

    /// Create a delivery error.
    pub fn delivery(username: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SinkDelivery {
            username: username.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
