//! Sink trait definition.

use chrono::{DateTime, Utc};
use sync_core::{Event, Fingerprint, IssueSnapshot};

use crate::SinkError;

/// Trait for destinations consuming issue change events.
///
/// # Call protocol
///
/// The sync driver calls the methods in this order:
///
/// ```text
/// last_updated                            once, while resolving the start watermark
/// ( begin (snapshot record*)* commit )*   once per fetched page
/// finish                                  once, after the pagination loop
/// save_last_updated                       once, if at least one page committed
/// ```
///
/// A failed `commit` aborts the run. The driver only advances the persisted
/// watermark after the whole run succeeds, so a rerun re-delivers the failed
/// page and, possibly, items that share the watermark instant. Implementations
/// must therefore apply events idempotently (upsert by
/// [`Event::natural_key`], never insert-only).
///
/// Buffering sinks (console, chat) do their real work in `finish`; streaming
/// sinks (database) write in `record` and make it durable in `commit`.
#[async_trait::async_trait]
pub trait Sink: Send {
    /// The sink's own notion of the watermark, if it keeps one.
    ///
    /// Consulted after an explicit `--since` and before the watermark store.
    async fn last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, SinkError> {
        Ok(None)
    }

    /// Record the final watermark of a successful run.
    async fn save_last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
        _watermark: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    /// Open the transaction for one page of events.
    async fn begin(&mut self) -> Result<(), SinkError>;

    /// Mirror the raw issue. Called once per fetched issue, before its events.
    async fn snapshot(&mut self, _issue: &IssueSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    /// Consume one event. Ownership passes to the sink.
    async fn record(&mut self, event: Event) -> Result<(), SinkError>;

    /// Make the current page durable.
    async fn commit(&mut self) -> Result<(), SinkError>;

    /// Flush deferred output after the last page.
    async fn finish(&mut self) -> Result<(), SinkError>;
}

#[async_trait::async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn last_updated(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, SinkError> {
        (**self).last_updated(fingerprint).await
    }

    async fn save_last_updated(
        &mut self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        (**self).save_last_updated(fingerprint, watermark).await
    }

    async fn begin(&mut self) -> Result<(), SinkError> {
        (**self).begin().await
    }

    async fn snapshot(&mut self, issue: &IssueSnapshot) -> Result<(), SinkError> {
        (**self).snapshot(issue).await
    }

    async fn record(&mut self, event: Event) -> Result<(), SinkError> {
        (**self).record(event).await
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        (**self).commit().await
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish().await
    }
}
