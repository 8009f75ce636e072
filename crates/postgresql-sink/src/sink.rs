//! Transactional PostgreSQL sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use issue_sink::{Sink, SinkError};
use sync_core::{CommentAdded, Event, FieldChanged, Fingerprint, IssueSnapshot};
use tokio_postgres::Client;

use crate::watermark::upsert_watermark;

const UPSERT_ISSUE: &str = "
    INSERT INTO issue (selector, key, value, updated)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (selector, key) DO UPDATE
    SET value = EXCLUDED.value, updated = EXCLUDED.updated";

const UPSERT_CHANGE: &str = "
    INSERT INTO issue_change
        (selector, key, history_id, item_index, created, field,
         from_string, to_string, author_key, author_name)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    ON CONFLICT (selector, key, history_id, item_index) DO UPDATE
    SET created = EXCLUDED.created,
        field = EXCLUDED.field,
        from_string = EXCLUDED.from_string,
        to_string = EXCLUDED.to_string,
        author_key = EXCLUDED.author_key,
        author_name = EXCLUDED.author_name";

const UPSERT_COMMENT: &str = "
    INSERT INTO issue_comment (selector, key, comment_id, created, author_name, body)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (selector, key, comment_id) DO UPDATE
    SET created = EXCLUDED.created,
        author_name = EXCLUDED.author_name,
        body = EXCLUDED.body";

/// Sink writing into the `issue`, `issue_change` and `issue_comment` tables.
///
/// Rows are scoped by `selector`, the fingerprint of the run's filter.
/// `IssueCreated` needs no row of its own: the issue snapshot already
/// carries the creation data.
pub struct PgSink {
    client: Arc<Client>,
    selector: String,
    in_transaction: bool,
}

impl PgSink {
    /// Wrap a connected client. The schema must already exist.
    pub fn new(client: Arc<Client>, fingerprint: &Fingerprint) -> Self {
        Self {
            client,
            selector: fingerprint.as_str().to_string(),
            in_transaction: false,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    async fn upsert_change(&self, change: &FieldChanged) -> Result<u64, SinkError> {
        let item_index = item_index_column(change)?;
        self.client
            .execute(
                UPSERT_CHANGE,
                &[
                    &self.selector,
                    &change.issue.key,
                    &change.history_id,
                    &item_index,
                    &change.timestamp,
                    &change.field,
                    &change.from,
                    &change.to,
                    &change.author_key,
                    &change.author_name,
                ],
            )
            .await
            .map_err(|e| record_error(change.issue.key.as_str(), "change", e))
    }

    async fn upsert_comment(&self, comment: &CommentAdded) -> Result<u64, SinkError> {
        self.client
            .execute(
                UPSERT_COMMENT,
                &[
                    &self.selector,
                    &comment.issue.key,
                    &comment.comment_id,
                    &comment.timestamp,
                    &comment.author_name,
                    &comment.body,
                ],
            )
            .await
            .map_err(|e| record_error(comment.issue.key.as_str(), "comment", e))
    }
}

fn record_error(key: &str, what: &str, source: tokio_postgres::Error) -> SinkError {
    SinkError::Record {
        what: format!("{what} of {key}"),
        source: source.into(),
    }
}

/// `item_index` as stored in the INTEGER column.
fn item_index_column(change: &FieldChanged) -> Result<i32, SinkError> {
    i32::try_from(change.item_index).map_err(|e| SinkError::Record {
        what: format!(
            "change {} item {} of {}",
            change.history_id, change.item_index, change.issue.key
        ),
        source: e.into(),
    })
}

#[async_trait::async_trait]
impl Sink for PgSink {
    async fn last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, SinkError> {
        let row = self
            .client
            .query_one(
                "SELECT max(updated) FROM issue WHERE selector = $1",
                &[&self.selector],
            )
            .await
            .map_err(SinkError::backend)?;
        row.try_get::<_, Option<DateTime<Utc>>>(0)
            .map_err(SinkError::backend)
    }

    async fn save_last_updated(
        &mut self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        upsert_watermark(&self.client, fingerprint, watermark)
            .await
            .map_err(SinkError::backend)?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), SinkError> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(SinkError::begin)?;
        self.in_transaction = true;
        Ok(())
    }

    async fn snapshot(&mut self, issue: &IssueSnapshot) -> Result<(), SinkError> {
        self.client
            .execute(
                UPSERT_ISSUE,
                &[&self.selector, &issue.key, &issue.raw, &issue.updated],
            )
            .await
            .map_err(|e| SinkError::Record {
                what: format!("issue {}", issue.key),
                source: e.into(),
            })?;
        Ok(())
    }

    async fn record(&mut self, event: Event) -> Result<(), SinkError> {
        match &event {
            Event::IssueCreated(_) => {}
            Event::FieldChanged(change) => {
                self.upsert_change(change).await?;
            }
            Event::CommentAdded(comment) => {
                self.upsert_comment(comment).await?;
            }
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.in_transaction = false;
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(SinkError::commit)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            tracing::warn!("Rolling back unfinished transaction");
            self.client
                .batch_execute("ROLLBACK")
                .await
                .map_err(SinkError::backend)?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sync_core::IssueRef;

    fn change(item_index: usize) -> FieldChanged {
        FieldChanged {
            issue: IssueRef::new("PRJ-1", "s"),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            field: "labels".to_string(),
            from: None,
            to: Some("x".to_string()),
            author_key: "jdoe".to_string(),
            author_name: "John Doe".to_string(),
            history_id: 42,
            item_index,
        }
    }

    #[test]
    fn test_item_index_fits_column() {
        assert_eq!(item_index_column(&change(3)).unwrap(), 3);
    }

    #[test]
    fn test_oversized_item_index_is_rejected() {
        let err = item_index_column(&change(i32::MAX as usize + 1)).unwrap_err();
        match err {
            SinkError::Record { what, .. } => {
                assert_eq!(what, format!("change 42 item {} of PRJ-1", i32::MAX as usize + 1))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
