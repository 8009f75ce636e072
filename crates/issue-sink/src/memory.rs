//! In-memory sink.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sync_core::{Event, Fingerprint, IssueSnapshot, NaturalKey};

use crate::{Sink, SinkError};

/// Idempotent in-memory sink.
///
/// Events are staged per transaction and upserted by natural key on commit,
/// so re-delivered events replace their earlier copy instead of duplicating
/// it. A commit failure can be injected to exercise abort/resume paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    committed: BTreeMap<NaturalKey, Event>,
    snapshots: BTreeMap<String, IssueSnapshot>,
    pending: Vec<Event>,
    pending_snapshots: Vec<IssueSnapshot>,
    in_transaction: bool,
    commits: usize,
    fail_commit_at: Option<usize>,
    deliveries: usize,
    finished: bool,
    reported_watermark: Option<DateTime<Utc>>,
    saved_watermark: Option<DateTime<Utc>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th commit (1-based) fail and discard its page.
    pub fn fail_commit_at(mut self, n: usize) -> Self {
        self.fail_commit_at = Some(n);
        self
    }

    /// Watermark returned from `last_updated`.
    pub fn reporting_watermark(mut self, watermark: DateTime<Utc>) -> Self {
        self.reported_watermark = Some(watermark);
        self
    }

    /// Committed events, ordered by timestamp then natural key.
    pub fn events(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.committed.values().collect();
        events.sort_by_key(|e| e.timestamp());
        events
    }

    pub fn snapshots(&self) -> &BTreeMap<String, IssueSnapshot> {
        &self.snapshots
    }

    /// Number of `record` calls, duplicates included.
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn saved_watermark(&self) -> Option<DateTime<Utc>> {
        self.saved_watermark
    }
}

#[async_trait::async_trait]
impl Sink for MemorySink {
    async fn last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, SinkError> {
        Ok(self.reported_watermark)
    }

    async fn save_last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        self.saved_watermark = Some(watermark);
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            return Err(SinkError::begin("transaction already open"));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn snapshot(&mut self, issue: &IssueSnapshot) -> Result<(), SinkError> {
        self.pending_snapshots.push(issue.clone());
        Ok(())
    }

    async fn record(&mut self, event: Event) -> Result<(), SinkError> {
        if !self.in_transaction {
            return Err(SinkError::Record {
                what: event.kind().to_string(),
                source: "no open transaction".into(),
            });
        }
        self.deliveries += 1;
        self.pending.push(event);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            return Err(SinkError::commit("no open transaction"));
        }
        self.in_transaction = false;
        self.commits += 1;

        if self.fail_commit_at == Some(self.commits) {
            tracing::debug!("Injected failure on commit {}", self.commits);
            self.pending.clear();
            self.pending_snapshots.clear();
            return Err(SinkError::commit("injected commit failure"));
        }

        for event in self.pending.drain(..) {
            self.committed.insert(event.natural_key(), event);
        }
        for snapshot in self.pending_snapshots.drain(..) {
            self.snapshots.insert(snapshot.key.clone(), snapshot);
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sync_core::{CommentAdded, IssueRef};

    fn comment(id: &str, min: u32) -> Event {
        Event::CommentAdded(CommentAdded {
            issue: IssueRef::new("A-1", "s"),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, min, 0).unwrap(),
            comment_id: id.to_string(),
            author_name: "x".to_string(),
            body: "b".to_string(),
        })
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let mut sink = MemorySink::new();
        for _ in 0..2 {
            sink.begin().await.unwrap();
            sink.record(comment("1", 1)).await.unwrap();
            sink.record(comment("2", 2)).await.unwrap();
            sink.commit().await.unwrap();
        }

        assert_eq!(sink.deliveries(), 4);
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.commits(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_discards_page() {
        let mut sink = MemorySink::new().fail_commit_at(1);
        sink.begin().await.unwrap();
        sink.record(comment("1", 1)).await.unwrap();

        let err = sink.commit().await.unwrap_err();
        assert!(err.to_string().contains("failed to commit transaction"));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_record_requires_transaction() {
        let mut sink = MemorySink::new();
        let err = sink.record(comment("1", 1)).await.unwrap_err();
        assert!(matches!(err, SinkError::Record { .. }));
    }

    #[tokio::test]
    async fn test_begin_twice_is_rejected() {
        let mut sink = MemorySink::new();
        sink.begin().await.unwrap();
        assert!(sink.begin().await.is_err());
    }
}
