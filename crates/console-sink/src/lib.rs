//! Console sink.
//!
//! Buffers every committed event and prints them in `finish`, sorted by time
//! and grouped under a `[KEY] summary` header per contiguous run of the same
//! issue:
//!
//! ```text
//!
//! [PRJ-1] Broken build
//!
//!    2024-05-01 10:00 -- created by Ann
//!    2024-05-01 11:30 -- status: Open --> In Progress (John Doe)
//!    2024-05-01 12:00 -- comment by Bob: looking into it
//! ```

use std::io::{self, Stdout, Write};

use chrono::{DateTime, Duration, Utc};
use issue_sink::{Sink, SinkError};
use sync_core::{group_by_issue, Event, Fingerprint, IssueGroup};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How far back a console run looks when no explicit start is given.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Sink rendering events as plain text to a writer (stdout by default).
pub struct ConsoleSink<W = Stdout> {
    out: W,
    pending: Vec<Event>,
    committed: Vec<Event>,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            pending: Vec::new(),
            committed: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render grouped events in the console layout.
pub fn render<W: Write>(out: &mut W, groups: &[IssueGroup]) -> io::Result<()> {
    for group in groups {
        writeln!(out)?;
        writeln!(out, "[{}] {}", group.key, group.summary)?;
        writeln!(out)?;
        for event in &group.events {
            writeln!(out, "   {}", describe(event))?;
        }
    }
    out.flush()
}

fn describe(event: &Event) -> String {
    let at = format_time(event.timestamp());
    match event {
        Event::IssueCreated(created) => format!("{at} -- created by {}", created.creator_name),
        Event::FieldChanged(change) => {
            let from = match change.from.as_deref() {
                Some(from) if !from.is_empty() => format!("{from} --> "),
                _ => String::new(),
            };
            format!(
                "{at} -- {}: {from}{} ({})",
                change.field,
                change.to.as_deref().unwrap_or_default(),
                change.author_name
            )
        }
        Event::CommentAdded(comment) => format!(
            "{at} -- comment by {}: {}",
            comment.author_name,
            comment.body.lines().next().unwrap_or_default()
        ),
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format(TIME_FORMAT).to_string()
}

#[async_trait::async_trait]
impl<W: Write + Send> Sink for ConsoleSink<W> {
    async fn last_updated(
        &mut self,
        _fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, SinkError> {
        Ok(Some(Utc::now() - Duration::hours(DEFAULT_LOOKBACK_HOURS)))
    }

    async fn begin(&mut self) -> Result<(), SinkError> {
        self.pending.clear();
        Ok(())
    }

    async fn record(&mut self, event: Event) -> Result<(), SinkError> {
        self.pending.push(event);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.committed.append(&mut self.pending);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let events = std::mem::take(&mut self.committed);
        tracing::debug!("Rendering {} events", events.len());
        let groups = group_by_issue(events);
        render(&mut self.out, &groups)?;
        Ok(())
    }
}
