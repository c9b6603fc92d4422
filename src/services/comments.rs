// src/services/comments.rs

//! Comment source service.
//!
//! Scrapes the comment list of a Hatena Bookmark entry page and resolves
//! each comment's posting time from its permalink page.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Bookmark, Comment, RawComment, SourceConfig};
use crate::utils::Pacer;
use crate::utils::http::fetch_page_async;
use crate::utils::url::resolve;

/// Where comments come from.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// URL of the page listing the bookmark's comments.
    fn comment_page_url(&self, bookmark: &Bookmark) -> Result<String>;

    /// Fetch a comment page and return its comments in page order.
    async fn fetch_page(&self, url: &str) -> Result<Vec<RawComment>>;

    /// Look up when the comment behind `permalink` was posted.
    async fn resolve_timestamp(&self, permalink: &str) -> Result<DateTime<Utc>>;
}

/// Comments gathered for one bookmark.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Resolved comments in page order, one per username
    pub comments: Vec<Comment>,
    /// Comments whose timestamp could not be resolved
    pub failures: Vec<AppError>,
}

/// Fetch a bookmark's comments with their timestamps resolved.
///
/// Only the first comment of each username in page order is kept. A failed
/// timestamp lookup drops that one comment and is reported in
/// `FetchOutcome::failures`. Every request to the source waits on `pacer`.
pub async fn fetch_comments(
    source: &dyn CommentSource,
    bookmark: &Bookmark,
    pacer: &mut Pacer,
) -> Result<FetchOutcome> {
    let url = source.comment_page_url(bookmark)?;

    pacer.wait().await;
    let raw = source.fetch_page(&url).await?;
    log::debug!("{} comments on {} (including duplicates)", raw.len(), url);

    let mut users = HashSet::new();
    let mut outcome = FetchOutcome::default();

    for comment in raw {
        if !users.insert(comment.username.clone()) {
            continue;
        }

        pacer.wait().await;
        match source.resolve_timestamp(&comment.permalink).await {
            Ok(posted_at) => outcome.comments.push(comment.resolved(posted_at)),
            Err(error) => {
                let error = match error {
                    e @ AppError::CommentResolution { .. } => e,
                    other => AppError::resolution(&comment.permalink, other),
                };
                log::warn!("{}", error);
                outcome.failures.push(error);
            }
        }
    }

    Ok(outcome)
}

struct ParsedSelectors {
    row: Selector,
    username: Selector,
    avatar: Selector,
    text: Selector,
    permalink: Selector,
    date: Selector,
}

/// Comment source backed by the Hatena Bookmark website.
pub struct HatenaSource {
    client: Client,
    site_base: String,
    date_format: String,
    timezone: FixedOffset,
    selectors: ParsedSelectors,
}

impl HatenaSource {
    /// Create a source from configuration, validating the selectors up front.
    pub fn new(config: &SourceConfig, client: Client) -> Result<Self> {
        let s = &config.selectors;
        let selectors = ParsedSelectors {
            row: Self::parse_selector(&s.row)?,
            username: Self::parse_selector(&s.username)?,
            avatar: Self::parse_selector(&s.avatar)?,
            text: Self::parse_selector(&s.text)?,
            permalink: Self::parse_selector(&s.permalink)?,
            date: Self::parse_selector(&s.date)?,
        };

        Ok(Self {
            client,
            site_base: config.site_base.clone(),
            date_format: config.date_format.clone(),
            timezone: config.timezone()?,
            selectors,
        })
    }

    /// Extract comment rows from an entry page.
    fn parse_comments(&self, document: &Html) -> Vec<RawComment> {
        document
            .select(&self.selectors.row)
            .filter_map(|row| self.parse_comment_row(&row))
            .collect()
    }

    fn parse_comment_row(&self, row: &ElementRef) -> Option<RawComment> {
        let username = Self::text_of(row, &self.selectors.username)?;
        if username.is_empty() {
            return None;
        }

        let href = row
            .select(&self.selectors.permalink)
            .next()
            .and_then(|a| a.value().attr("href"))?;
        let permalink = match resolve(&self.site_base, href) {
            Ok(link) => link,
            Err(e) => {
                log::debug!("Skipping comment by {}: bad permalink {}: {}", username, href, e);
                return None;
            }
        };

        let avatar_url = row
            .select(&self.selectors.avatar)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .unwrap_or("")
            .to_string();
        let text = Self::text_of(row, &self.selectors.text).unwrap_or_default();

        Some(RawComment {
            username,
            avatar_url,
            text,
            permalink,
        })
    }

    /// Extract the posting time from a permalink page.
    fn parse_timestamp(&self, document: &Html, permalink: &str) -> Result<DateTime<Utc>> {
        let raw: String = document
            .select(&self.selectors.date)
            .next()
            .map(|el| el.text().collect())
            .ok_or_else(|| AppError::resolution(permalink, "timestamp element not found"))?;

        let raw = raw.trim();
        let naive = NaiveDateTime::parse_from_str(raw, &self.date_format).map_err(|e| {
            AppError::resolution(permalink, format!("bad timestamp '{raw}': {e}"))
        })?;

        self.timezone
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| AppError::resolution(permalink, "ambiguous local time"))
    }

    fn text_of(row: &ElementRef, selector: &Selector) -> Option<String> {
        row.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[async_trait]
impl CommentSource for HatenaSource {
    fn comment_page_url(&self, bookmark: &Bookmark) -> Result<String> {
        bookmark.comment_page_url(&self.site_base)
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<RawComment>> {
        let document = fetch_page_async(&self.client, url).await?;
        Ok(self.parse_comments(&document))
    }

    async fn resolve_timestamp(&self, permalink: &str) -> Result<DateTime<Utc>> {
        let document = fetch_page_async(&self.client, permalink)
            .await
            .map_err(|e| AppError::resolution(permalink, e))?;
        self.parse_timestamp(&document, permalink)
    }
}
