// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};

static BOOKMARK_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?)://(.+)$").expect("static regex"));

/// Derive the Hatena entry page URL for a bookmarked article.
///
/// Secure articles live under `/entry/s/`, plain ones under `/entry/`.
///
/// # Examples
/// ```
/// use hatebu_relay::utils::url::entry_url;
///
/// assert_eq!(
///     entry_url("https://b.hatena.ne.jp", "https://example.com/a").unwrap(),
///     "https://b.hatena.ne.jp/entry/s/example.com/a"
/// );
/// ```
pub fn entry_url(site_base: &str, bookmark_url: &str) -> Result<String> {
    let caps = BOOKMARK_URL
        .captures(bookmark_url.trim())
        .ok_or_else(|| AppError::malformed_url(bookmark_url))?;

    let base = site_base.trim_end_matches('/');
    let rest = &caps[2];
    match &caps[1] {
        "https" => Ok(format!("{base}/entry/s/{rest}")),
        _ => Ok(format!("{base}/entry/{rest}")),
    }
}

/// Resolve a potentially relative href against a base URL.
pub fn resolve(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base)?;
    Ok(base.join(href)?.to_string())
}
