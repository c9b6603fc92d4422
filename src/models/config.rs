//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable that overrides `sink.webhook_url`.
pub const WEBHOOK_URL_ENV: &str = "HATEBU_RELAY_WEBHOOK_URL";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Comment source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Notification sink settings
    #[serde(default)]
    pub sink: SinkConfig,

    /// Run-level settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                self.sink.webhook_url = url;
            }
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.source.site_base)
            .map_err(|e| AppError::validation(format!("source.site_base is invalid: {e}")))?;
        self.source.timezone()?;
        if self.sink.webhook_url.trim().is_empty() {
            return Err(AppError::validation(format!(
                "sink.webhook_url is empty (set it in config or {WEBHOOK_URL_ENV})"
            )));
        }
        url::Url::parse(&self.sink.webhook_url)
            .map_err(|e| AppError::validation(format!("sink.webhook_url is invalid: {e}")))?;
        if reqwest::StatusCode::from_u16(self.sink.success_status).is_err() {
            return Err(AppError::validation(format!(
                "sink.success_status {} is not an HTTP status",
                self.sink.success_status
            )));
        }
        if self.sink.message_template.trim().is_empty() {
            return Err(AppError::validation("sink.message_template is empty"));
        }
        if self.sync.retention_days < 0 {
            return Err(AppError::validation("sync.retention_days must be >= 0"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Where and how comments are scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the bookmarking site
    #[serde(default = "defaults::site_base")]
    pub site_base: String,

    /// Minimum delay between requests to the site, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Offset of the timestamps printed on permalink pages
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// `chrono` format of the permalink page timestamp
    #[serde(default = "defaults::date_format")]
    pub date_format: String,

    #[serde(default)]
    pub selectors: CommentSelectors,
}

impl SourceConfig {
    /// Timezone the site prints timestamps in.
    pub fn timezone(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "source.utc_offset_hours {} is out of range",
                    self.utc_offset_hours
                ))
            })
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            site_base: defaults::site_base(),
            request_delay_ms: defaults::request_delay(),
            utc_offset_hours: defaults::utc_offset_hours(),
            date_format: defaults::date_format(),
            selectors: CommentSelectors::default(),
        }
    }
}

/// CSS selectors for the entry and permalink pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSelectors {
    #[serde(default = "defaults::row_selector")]
    pub row: String,
    #[serde(default = "defaults::username_selector")]
    pub username: String,
    #[serde(default = "defaults::avatar_selector")]
    pub avatar: String,
    #[serde(default = "defaults::text_selector")]
    pub text: String,
    #[serde(default = "defaults::permalink_selector")]
    pub permalink: String,
    /// Timestamp element on the permalink page
    #[serde(default = "defaults::date_selector")]
    pub date: String,
}

impl Default for CommentSelectors {
    fn default() -> Self {
        Self {
            row: defaults::row_selector(),
            username: defaults::username_selector(),
            avatar: defaults::avatar_selector(),
            text: defaults::text_selector(),
            permalink: defaults::permalink_selector(),
            date: defaults::date_selector(),
        }
    }
}

/// Chat webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Incoming webhook URL
    #[serde(default)]
    pub webhook_url: String,

    /// Status code the webhook answers with on success
    #[serde(default = "defaults::success_status")]
    pub success_status: u16,

    /// Minimum delay between deliveries, in milliseconds
    #[serde(default = "defaults::delivery_delay")]
    pub delivery_delay_ms: u64,

    /// Message body template (see `Comment::to_message`)
    #[serde(default = "defaults::message_template")]
    pub message_template: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            success_status: defaults::success_status(),
            delivery_delay_ms: defaults::delivery_delay(),
            message_template: defaults::message_template(),
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Days without a new comment before a bookmark is retired
    #[serde(default = "defaults::retention_days")]
    pub retention_days: i64,

    /// Minimum delay between bookmarks, in milliseconds
    #[serde(default = "defaults::bookmark_delay")]
    pub bookmark_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention_days: defaults::retention_days(),
            bookmark_delay_ms: defaults::bookmark_delay(),
        }
    }
}

mod defaults {
    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; hatebu-relay/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Source defaults
    pub fn site_base() -> String {
        "https://b.hatena.ne.jp".into()
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn utc_offset_hours() -> i32 {
        9
    }
    pub fn date_format() -> String {
        "%Y/%m/%d %H:%M".into()
    }
    pub fn row_selector() -> String {
        ".entry-comment-contents".into()
    }
    pub fn username_selector() -> String {
        ".entry-comment-username".into()
    }
    pub fn avatar_selector() -> String {
        "img".into()
    }
    pub fn text_selector() -> String {
        "span.entry-comment-text".into()
    }
    pub fn permalink_selector() -> String {
        ".entry-comment-permalink > a".into()
    }
    pub fn date_selector() -> String {
        "span.comment-body-date > a".into()
    }

    // Sink defaults
    pub fn success_status() -> u16 {
        204
    }
    pub fn delivery_delay() -> u64 {
        2000
    }
    pub fn message_template() -> String {
        "{text}\n{permalink}".into()
    }

    // Sync defaults
    pub fn retention_days() -> i64 {
        30
    }
    pub fn bookmark_delay() -> u64 {
        2000
    }
}
