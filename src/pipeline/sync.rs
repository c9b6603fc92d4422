// src/pipeline/sync.rs

//! One synchronization run over every tracked bookmark.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Bookmark, Config};
use crate::pipeline::filter::filter;
use crate::pipeline::lifecycle::{LifecycleState, apply, transition};
use crate::pipeline::order::order;
use crate::services::{CommentSource, DeliveryOutcome, NotificationSink, deliver, fetch_comments};
use crate::storage::BookmarkStore;
use crate::utils::Pacer;

/// Summary of a sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub bookmarks_total: usize,
    pub bookmarks_skipped: usize,
    pub bookmarks_active: usize,
    pub bookmarks_stale: usize,
    pub bookmarks_retired: usize,
    pub comments_fetched: usize,
    pub resolution_failures: usize,
    pub survivors: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub persistence_failures: usize,
}

impl SyncReport {
    fn record(&mut self, state: LifecycleState) {
        match state {
            LifecycleState::Active => self.bookmarks_active += 1,
            LifecycleState::Stale => self.bookmarks_stale += 1,
            LifecycleState::Retired => self.bookmarks_retired += 1,
        }
    }
}

struct Pacers {
    source: Pacer,
    delivery: Pacer,
    bookmark: Pacer,
}

/// Drives the fetch → filter → order → persist → deliver pipeline.
pub struct Synchronizer<'a> {
    store: &'a dyn BookmarkStore,
    source: &'a dyn CommentSource,
    sink: &'a dyn NotificationSink,
    config: &'a Config,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a dyn BookmarkStore,
        source: &'a dyn CommentSource,
        sink: &'a dyn NotificationSink,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            config,
        }
    }

    /// Process every bookmark once, in store order.
    ///
    /// Only failing to read the bookmark list or ignore list is an error;
    /// everything after that is counted in the report and logged.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SyncReport> {
        let bookmarks = self.store.list().await?;
        let ignored: HashSet<String> = self
            .store
            .list_ignored_usernames()
            .await?
            .into_iter()
            .collect();

        log::info!(
            "Syncing {} bookmarks ({} ignored users)",
            bookmarks.len(),
            ignored.len()
        );

        let mut pacers = Pacers {
            source: Pacer::from_millis(self.config.source.request_delay_ms),
            delivery: Pacer::from_millis(self.config.sink.delivery_delay_ms),
            bookmark: Pacer::from_millis(self.config.sync.bookmark_delay_ms),
        };
        let mut report = SyncReport {
            bookmarks_total: bookmarks.len(),
            ..SyncReport::default()
        };

        for bookmark in &bookmarks {
            pacers.bookmark.wait().await;
            self.sync_bookmark(bookmark, &ignored, now, &mut pacers, &mut report)
                .await;
        }

        Ok(report)
    }

    async fn sync_bookmark(
        &self,
        bookmark: &Bookmark,
        ignored: &HashSet<String>,
        now: DateTime<Utc>,
        pacers: &mut Pacers,
        report: &mut SyncReport,
    ) {
        let fetched = match fetch_comments(self.source, bookmark, &mut pacers.source).await {
            Ok(fetched) => fetched,
            Err(error @ AppError::MalformedUrl(_)) => {
                log::warn!("Skipping {}: {}", bookmark.url, error);
                report.bookmarks_skipped += 1;
                return;
            }
            // A page that keeps failing is skipped every run and never retires.
            Err(error) => {
                log::error!("Skipping {}: {}", bookmark.url, error);
                report.bookmarks_skipped += 1;
                return;
            }
        };
        report.comments_fetched += fetched.comments.len();
        report.resolution_failures += fetched.failures.len();

        let filtered = filter(fetched.comments, ignored, bookmark);
        for dropped in &filtered.drops {
            log::debug!(
                "Not relaying {} on {}: {}",
                dropped.username,
                bookmark.url,
                dropped.reason
            );
        }

        let (survivors, new_watermark) = order(filtered.survivors, bookmark.watermark);
        let next = transition(
            filtered.bookmark,
            survivors.len(),
            new_watermark,
            now,
            self.config.sync.retention_days,
        );
        log::info!(
            "{}: {} new comments ({:?})",
            bookmark.url,
            survivors.len(),
            next.state
        );

        report.record(next.state);
        report.survivors += survivors.len();
        report.persistence_failures += apply(self.store, &next).await.len();

        for comment in &survivors {
            pacers.delivery.wait().await;
            match deliver(
                self.sink,
                comment,
                &self.config.sink.message_template,
                &bookmark.url,
            )
            .await
            {
                Ok(DeliveryOutcome::Delivered) => report.delivered += 1,
                Ok(DeliveryOutcome::Rejected(status)) => {
                    log::warn!(
                        "Sink rejected comment by {} on {} with status {}",
                        comment.username,
                        bookmark.url,
                        status
                    );
                    report.delivery_failures += 1;
                }
                Err(error) => {
                    log::warn!("{}", error);
                    report.delivery_failures += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{FakeSink, FakeSource};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const URL: &str = "https://example.com/article";

    fn date(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, m, d, 0, 0, 0).unwrap()
    }

    fn quiet_config(retention_days: i64) -> Config {
        let mut config = Config::default();
        config.source.request_delay_ms = 0;
        config.sink.delivery_delay_ms = 0;
        config.sink.message_template = "{text}".to_string();
        config.sync.bookmark_delay_ms = 0;
        config.sync.retention_days = retention_days;
        config
    }

    /// In-memory store that records every call.
    #[derive(Default)]
    struct MemoryStore {
        bookmarks: Mutex<Vec<Bookmark>>,
        ignored: Vec<String>,
        saves: Mutex<usize>,
        removed: Mutex<Vec<String>>,
        fail_saves: bool,
    }

    impl MemoryStore {
        fn with(bookmarks: Vec<Bookmark>, ignored: &[&str]) -> Self {
            Self {
                bookmarks: Mutex::new(bookmarks),
                ignored: ignored.iter().map(|u| u.to_string()).collect(),
                ..Self::default()
            }
        }

        fn get(&self, url: &str) -> Option<Bookmark> {
            self.bookmarks
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.url == url)
                .cloned()
        }
    }

    #[async_trait]
    impl BookmarkStore for MemoryStore {
        async fn list(&self) -> Result<Vec<Bookmark>> {
            Ok(self.bookmarks.lock().unwrap().clone())
        }

        async fn save(&self, bookmark: &Bookmark) -> Result<()> {
            if self.fail_saves {
                return Err(AppError::persistence(&bookmark.url, "backend down"));
            }
            *self.saves.lock().unwrap() += 1;
            let mut bookmarks = self.bookmarks.lock().unwrap();
            if let Some(existing) = bookmarks.iter_mut().find(|b| b.url == bookmark.url) {
                *existing = bookmark.clone();
            }
            Ok(())
        }

        async fn remove(&self, bookmark: &Bookmark) -> Result<()> {
            self.removed.lock().unwrap().push(bookmark.url.clone());
            self.bookmarks
                .lock()
                .unwrap()
                .retain(|b| b.url != bookmark.url);
            Ok(())
        }

        async fn list_ignored_usernames(&self) -> Result<Vec<String>> {
            Ok(self.ignored.clone())
        }

        async fn ignore(&self, _username: &str) -> Result<()> {
            Ok(())
        }
    }

    fn bookmark_at(url: &str, watermark: DateTime<Utc>) -> Bookmark {
        Bookmark {
            watermark,
            ..Bookmark::new(url)
        }
    }

    fn sent_users(sink: &FakeSink) -> Vec<String> {
        sink.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.display_name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_new_comment_delivered_and_ignored_user_dropped() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &["bob"]);
        let source = FakeSource::default()
            .with_comment(URL, "alice", date(1, 5))
            .with_comment(URL, "bob", date(1, 6));
        let sink = FakeSink::default();
        let config = quiet_config(30);

        let report = Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 7))
            .await
            .unwrap();

        assert_eq!(sent_users(&sink), vec!["alice"]);
        assert_eq!(sink.sent.lock().unwrap()[0].body, "comment by alice");
        assert_eq!(report.delivered, 1);
        assert_eq!(report.bookmarks_active, 1);

        let saved = store.get(URL).unwrap();
        assert_eq!(saved.watermark, date(1, 5));
        assert_eq!(
            saved.seen_users.iter().collect::<Vec<_>>(),
            vec!["alice"]
        );
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent_but_still_saves() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &["bob"]);
        let source = FakeSource::default()
            .with_comment(URL, "alice", date(1, 5))
            .with_comment(URL, "bob", date(1, 6));
        let sink = FakeSink::default();
        let config = quiet_config(30);
        let sync = Synchronizer::new(&store, &source, &sink, &config);

        sync.run(date(1, 7)).await.unwrap();
        let after_first = store.get(URL).unwrap();
        let saves_after_first = *store.saves.lock().unwrap();

        let report = sync.run(date(1, 8)).await.unwrap();
        assert_eq!(report.delivered, 0);
        assert_eq!(report.bookmarks_stale, 1);
        assert_eq!(sent_users(&sink), vec!["alice"]);
        assert_eq!(store.get(URL).unwrap(), after_first);
        assert_eq!(*store.saves.lock().unwrap(), saves_after_first + 1);
    }

    #[tokio::test]
    async fn test_stale_bookmark_retired_once() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &[]);
        let source = FakeSource::default();
        let sink = FakeSink::default();
        let config = quiet_config(10);
        let sync = Synchronizer::new(&store, &source, &sink, &config);

        let report = sync.run(date(2, 1)).await.unwrap();
        assert_eq!(report.bookmarks_retired, 1);
        assert_eq!(*store.removed.lock().unwrap(), vec![URL.to_string()]);

        let report = sync.run(date(2, 2)).await.unwrap();
        assert_eq!(report.bookmarks_total, 0);
        assert_eq!(store.removed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deliveries_are_chronological() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &[]);
        let source = FakeSource::default()
            .with_comment(URL, "carol", date(1, 9))
            .with_comment(URL, "alice", date(1, 3))
            .with_comment(URL, "bob", date(1, 6));
        let sink = FakeSink::default();
        let config = quiet_config(30);

        Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 10))
            .await
            .unwrap();

        assert_eq!(sent_users(&sink), vec!["alice", "bob", "carol"]);
        assert_eq!(store.get(URL).unwrap().watermark, date(1, 9));
    }

    #[tokio::test]
    async fn test_bad_bookmark_does_not_stop_run() {
        let other = "http://example.org/post";
        let store = MemoryStore::with(
            vec![bookmark_at("not-a-url", date(1, 1)), bookmark_at(other, date(1, 1))],
            &[],
        );
        let source = FakeSource::default()
            .with_unresolvable(other, "ghost")
            .with_comment(other, "alice", date(1, 5));
        let sink = FakeSink {
            reject: ["alice".to_string()].into(),
            ..FakeSink::default()
        };
        let config = quiet_config(30);

        let report = Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 6))
            .await
            .unwrap();

        assert_eq!(report.bookmarks_skipped, 1);
        assert_eq!(report.resolution_failures, 1);
        assert_eq!(report.delivery_failures, 1);
        assert_eq!(report.delivered, 0);
        // Progress is persisted before delivery, so a rejected message is not retried.
        assert_eq!(store.get(other).unwrap().watermark, date(1, 5));
        assert!(!store.get(other).unwrap().seen_users.contains("ghost"));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_counted_and_delivery_continues() {
        let store = MemoryStore {
            fail_saves: true,
            ..MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &[])
        };
        let source = FakeSource::default().with_comment(URL, "alice", date(1, 5));
        let sink = FakeSink::default();
        let config = quiet_config(30);

        let report = Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 6))
            .await
            .unwrap();

        assert_eq!(report.persistence_failures, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(store.get(URL).unwrap().watermark, date(1, 1));
    }

    #[tokio::test]
    async fn test_failing_entry_page_skips_bookmark_only() {
        let broken = "https://example.com/deleted";
        let store = MemoryStore::with(
            vec![bookmark_at(broken, date(1, 1)), bookmark_at(URL, date(1, 1))],
            &[],
        );
        let source = FakeSource::default()
            .with_comment(broken, "bob", date(1, 4))
            .with_failing_page(broken)
            .with_comment(URL, "alice", date(1, 5));
        let sink = FakeSink::default();
        let config = quiet_config(10);

        let report = Synchronizer::new(&store, &source, &sink, &config)
            .run(date(3, 1))
            .await
            .unwrap();

        assert_eq!(report.bookmarks_skipped, 1);
        assert_eq!(report.bookmarks_active, 1);
        assert_eq!(report.bookmarks_retired, 0);
        assert_eq!(sent_users(&sink), vec!["alice"]);
        // Skipped bookmarks are neither saved nor retired.
        assert_eq!(*store.saves.lock().unwrap(), 1);
        assert!(store.removed.lock().unwrap().is_empty());
        assert_eq!(store.get(broken).unwrap(), bookmark_at(broken, date(1, 1)));
    }

    #[tokio::test]
    async fn test_unreachable_sink_counts_failure_and_continues() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &[]);
        let source = FakeSource::default()
            .with_comment(URL, "alice", date(1, 3))
            .with_comment(URL, "bob", date(1, 4));
        let sink = FakeSink {
            unreachable: ["alice".to_string()].into(),
            ..FakeSink::default()
        };
        let config = quiet_config(30);

        let report = Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 5))
            .await
            .unwrap();

        assert_eq!(report.delivery_failures, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(sent_users(&sink), vec!["bob"]);
        assert_eq!(store.get(URL).unwrap().watermark, date(1, 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliveries_are_paced() {
        let store = MemoryStore::with(vec![bookmark_at(URL, date(1, 1))], &[]);
        let source = FakeSource::default()
            .with_comment(URL, "alice", date(1, 3))
            .with_comment(URL, "bob", date(1, 4))
            .with_comment(URL, "carol", date(1, 5));
        let sink = FakeSink::default();
        let mut config = quiet_config(30);
        config.sink.delivery_delay_ms = 2000;

        let start = tokio::time::Instant::now();
        Synchronizer::new(&store, &source, &sink, &config)
            .run(date(1, 6))
            .await
            .unwrap();

        assert_eq!(sent_users(&sink).len(), 3);
        assert!(start.elapsed() >= std::time::Duration::from_millis(4000));
    }
}
