// src/services/notifier.rs

//! Notification sink service.
//!
//! Posts one chat message per comment to an incoming webhook.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Comment, Message, SinkConfig};

/// Result of handing one message to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The sink answered with an unexpected status code
    Rejected(u16),
}

/// Where messages go.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send one message. Transport failures are errors; status-level
    /// refusals are `DeliveryOutcome::Rejected`.
    async fn send(&self, message: &Message) -> Result<DeliveryOutcome>;
}

/// Format a comment and send it to the sink.
pub async fn deliver(
    sink: &dyn NotificationSink,
    comment: &Comment,
    template: &str,
    bookmark_url: &str,
) -> Result<DeliveryOutcome> {
    let message = comment.to_message(template, bookmark_url);
    sink.send(&message)
        .await
        .map_err(|e| AppError::delivery(&comment.username, e))
}

/// Incoming-webhook notification sink.
pub struct WebhookNotifier {
    webhook_url: String,
    success_status: u16,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: &SinkConfig, client: Client) -> Self {
        Self {
            webhook_url: config.webhook_url.clone(),
            success_status: config.success_status,
            client,
        }
    }

    fn payload(message: &Message) -> serde_json::Value {
        json!({
            "username": message.display_name,
            "avatar_url": message.avatar_url,
            "content": message.body,
        })
    }

    fn outcome(&self, status: u16) -> DeliveryOutcome {
        if status == self.success_status {
            DeliveryOutcome::Delivered
        } else {
            DeliveryOutcome::Rejected(status)
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn send(&self, message: &Message) -> Result<DeliveryOutcome> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(message))
            .send()
            .await?;

        let outcome = self.outcome(resp.status().as_u16());
        if let DeliveryOutcome::Rejected(status) = outcome {
            let body = resp.text().await.unwrap_or_default();
            log::warn!("Webhook returned {} for {}: {}", status, message.display_name, body);
        }
        Ok(outcome)
    }
}
