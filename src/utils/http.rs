// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use scraper::Html;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
///
/// Every request made through it is bounded by `timeout_secs`.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page asynchronously and parse it as HTML.
pub async fn fetch_page_async(client: &reqwest::Client, url: &str) -> Result<Html> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(Html::parse_document(&text))
}
