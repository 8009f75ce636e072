//! Incremental sync driver.
//!
//! One run walks `Init -> FetchPage -> ExtractAndRecord -> Commit ->
//! {FetchPage | Drain} -> Finished`:
//!
//! 1. Resolve the filter fingerprint and the starting watermark.
//! 2. Fetch the issues updated strictly after the page cursor.
//! 3. Inside one sink transaction, snapshot every issue and record its events
//!    after the starting watermark, then advance the working watermark to the
//!    page's latest update.
//! 4. Commit, and fetch again while the source reports more matches. The
//!    next page starts just below the page's latest instant, so issues
//!    sharing that instant are never skipped; the ones already delivered are
//!    dropped on their second arrival.
//! 5. Call `finish`, then persist `max(stored, working)` once.
//!
//! Any error aborts the run before step 5, so the persisted watermark only
//! moves after a fully successful run.

use std::collections::HashSet;
use std::str::FromStr;

use checkpoint::WatermarkStore;
use chrono::{DateTime, Duration, Utc};
use issue_sink::Sink;
use issue_sync_jira_source::{extract_events, IssueRecord, IssueSource};
use sync_core::Fingerprint;
use tracing::{debug, info, warn};

use crate::SyncError;

/// Explicit start override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    /// Continue from the sink's or the store's watermark.
    Last,
    /// Start from a fixed instant.
    Epoch(DateTime<Utc>),
}

impl FromStr for Since {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "last" {
            return Ok(Since::Last);
        }
        s.parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(Since::Epoch)
            .ok_or_else(|| SyncError::InvalidSince(s.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// User filter fragment; also the fingerprint input.
    pub filter: String,
    pub since: Since,
    /// Start offset from now when no watermark is known.
    pub lookback: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            filter: String::new(),
            since: Since::Last,
            lookback: Duration::days(5),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub fingerprint: Fingerprint,
    pub started_from: DateTime<Utc>,
    /// Watermark persisted at the end of the run, or the start when nothing
    /// was committed.
    pub watermark: DateTime<Utc>,
    pub pages: usize,
    pub issues: usize,
    pub events: usize,
}

/// Runs the fetch/extract/record loop between one source, one sink and one
/// watermark store.
pub struct SyncDriver<S, K, W> {
    source: S,
    sink: K,
    store: W,
    options: SyncOptions,
}

impl<S, K, W> SyncDriver<S, K, W>
where
    S: IssueSource,
    K: Sink,
    W: WatermarkStore,
{
    pub fn new(source: S, sink: K, store: W, options: SyncOptions) -> Self {
        Self {
            source,
            sink,
            store,
            options,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.options.filter)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn store(&self) -> &W {
        &self.store
    }

    pub fn into_parts(self) -> (S, K, W) {
        (self.source, self.sink, self.store)
    }

    /// Starting watermark: explicit override, then the sink's own value, then
    /// the stored one, then `now - lookback`.
    async fn resolve_start(
        &mut self,
        fingerprint: &Fingerprint,
        stored: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, SyncError> {
        if let Since::Epoch(start) = self.options.since {
            debug!("Using explicit start {start}");
            return Ok(start);
        }
        if let Some(start) = self.sink.last_updated(fingerprint).await? {
            debug!("Using sink watermark {start}");
            return Ok(start);
        }
        if let Some(start) = stored {
            debug!("Using stored watermark {start}");
            return Ok(start);
        }
        let start = Utc::now() - self.options.lookback;
        debug!("No watermark known, looking back to {start}");
        Ok(start)
    }

    pub async fn run(&mut self) -> Result<SyncReport, SyncError> {
        let fingerprint = self.fingerprint();
        let stored = self.store.get(&fingerprint).await?;
        let start = self.resolve_start(&fingerprint, stored).await?;
        info!(
            "Checking changes since {} (fingerprint {fingerprint})",
            start.to_rfc3339()
        );

        let mut report = SyncReport {
            fingerprint: fingerprint.clone(),
            started_from: start,
            watermark: start,
            pages: 0,
            issues: 0,
            events: 0,
        };
        let mut watermark = start;
        let mut cursor = PageCursor::new(start);
        let mut boundary = Boundary::default();

        loop {
            let page = self
                .source
                .fetch_page(cursor.since, cursor.start_at, &self.options.filter)
                .await?;

            if page.issues.is_empty() {
                if page.total > page.start_at {
                    warn!(
                        "Source reported {} matching issues but returned none, stopping",
                        page.total
                    );
                } else if report.pages == 0 {
                    info!("No changes found");
                }
                break;
            }

            let more = page.has_more();
            let mut instants = Vec::with_capacity(page.issues.len());
            let mut page_events = 0;

            self.sink.begin().await?;
            for raw in page.issues {
                let record = IssueRecord::from_value(raw)?;
                instants.push(record.updated);
                if !boundary.first_delivery(&record) {
                    debug!("{}: already delivered in this run", record.key);
                    continue;
                }
                self.sink.snapshot(&record.snapshot()).await?;

                let events = extract_events(&record, start);
                debug!("{}: {} new events", record.key, events.len());
                page_events += events.len();
                for event in events {
                    self.sink.record(event).await?;
                }

                watermark = watermark.max(record.updated);
                report.issues += 1;
            }
            self.sink.commit().await?;

            report.pages += 1;
            report.events += page_events;
            info!(
                "Committed page {} ({page_events} events, {} of {} matches), watermark now {}",
                report.pages,
                (page.start_at + page.max_results).min(page.total),
                page.total,
                watermark.to_rfc3339()
            );

            if !more {
                break;
            }
            cursor = cursor.next(&instants);
        }

        self.sink.finish().await?;

        if report.pages > 0 {
            let persisted = stored.map_or(watermark, |stored| stored.max(watermark));
            self.store.put(&fingerprint, persisted).await?;
            self.sink.save_last_updated(&fingerprint, persisted).await?;
            report.watermark = persisted;
            info!("Saved watermark {}", persisted.to_rfc3339());
        }

        Ok(report)
    }
}

/// Where the next page request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageCursor {
    since: DateTime<Utc>,
    start_at: u64,
}

impl PageCursor {
    fn new(since: DateTime<Utc>) -> Self {
        Self { since, start_at: 0 }
    }

    /// Cursor after a full page whose issues were updated at `instants`.
    ///
    /// More issues may share the page's last instant, so the next query
    /// starts just below it and the already seen ones come back again. When
    /// the whole page shares that instant, re-querying from below it would
    /// return the same page, so the offset within the instant advances
    /// instead.
    fn next(self, instants: &[DateTime<Utc>]) -> Self {
        let Some(last) = instants.iter().max().copied() else {
            return self;
        };
        let since = last - Duration::milliseconds(1);
        if instants.iter().all(|t| *t == last) {
            let skipped = if self.since == since { self.start_at } else { 0 };
            Self {
                since,
                start_at: skipped + instants.len() as u64,
            }
        } else {
            Self { since, start_at: 0 }
        }
    }
}

/// Issues already delivered at the latest instant seen in this run.
#[derive(Debug, Default)]
struct Boundary {
    instant: Option<DateTime<Utc>>,
    keys: HashSet<String>,
}

impl Boundary {
    /// Records the delivery of `record`; false if it was delivered before at
    /// the same instant.
    fn first_delivery(&mut self, record: &IssueRecord) -> bool {
        match self.instant {
            Some(instant) if record.updated < instant => true,
            Some(instant) if record.updated == instant => self.keys.insert(record.key.clone()),
            _ => {
                self.instant = Some(record.updated);
                self.keys.clear();
                self.keys.insert(record.key.clone());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_since_parsing() {
        assert_eq!("last".parse::<Since>().unwrap(), Since::Last);
        assert_eq!("".parse::<Since>().unwrap(), Since::Last);
        assert_eq!(
            "1714557600".parse::<Since>().unwrap(),
            Since::Epoch(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert!(matches!(
            "yesterday".parse::<Since>(),
            Err(SyncError::InvalidSince(ref s)) if s == "yesterday"
        ));
    }

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.since, Since::Last);
        assert_eq!(options.lookback, Duration::days(5));
    }

    fn at(sec: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + sec, 0).unwrap()
    }

    #[test]
    fn test_cursor_backs_off_below_last_instant() {
        let cursor = PageCursor::new(at(0)).next(&[at(1), at(2), at(3)]);
        assert_eq!(cursor.since, at(3) - Duration::milliseconds(1));
        assert_eq!(cursor.start_at, 0);
    }

    #[test]
    fn test_cursor_steps_through_a_single_instant() {
        let cursor = PageCursor::new(at(0)).next(&[at(1), at(1)]);
        assert_eq!(cursor.since, at(1) - Duration::milliseconds(1));
        assert_eq!(cursor.start_at, 2);

        let cursor = cursor.next(&[at(1), at(1)]);
        assert_eq!(cursor.start_at, 4);

        let cursor = cursor.next(&[at(1), at(2)]);
        assert_eq!(cursor.since, at(2) - Duration::milliseconds(1));
        assert_eq!(cursor.start_at, 0);
    }

    #[test]
    fn test_boundary_skips_redelivered_issue() {
        let issue = |key: &str, sec: i64| IssueRecord {
            key: key.to_string(),
            summary: String::new(),
            created: at(sec),
            updated: at(sec),
            creator_name: String::new(),
            description: String::new(),
            histories: Vec::new(),
            comments: Vec::new(),
            raw: serde_json::Value::Null,
        };
        let mut boundary = Boundary::default();

        assert!(boundary.first_delivery(&issue("PRJ-1", 1)));
        assert!(boundary.first_delivery(&issue("PRJ-2", 1)));
        assert!(!boundary.first_delivery(&issue("PRJ-2", 1)));
        assert!(boundary.first_delivery(&issue("PRJ-3", 2)));
        assert!(boundary.first_delivery(&issue("PRJ-2", 2)));
    }
}
