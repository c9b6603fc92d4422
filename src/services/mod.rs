//! Service layer for the relay.
//!
//! This module contains the adapters to the outside world:
//! - Comment scraping (`HatenaSource`)
//! - Message delivery (`WebhookNotifier`)

mod comments;
mod notifier;

pub use comments::{CommentSource, FetchOutcome, HatenaSource, fetch_comments};
pub use notifier::{DeliveryOutcome, NotificationSink, WebhookNotifier, deliver};

#[cfg(test)]
pub(crate) use comments::tests::FakeSource;
#[cfg(test)]
pub(crate) use notifier::tests::FakeSink;
