//! Change events extracted from issue records.
//!
//! An [`Event`] is an immutable fact about one issue: it was created, one of
//! its fields changed, or somebody commented on it. Every event carries the
//! issue key and summary plus the instant it happened; sinks dispatch on the
//! variant with an exhaustive `match`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the issue an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Stable issue identifier (e.g. `HDDS-1234`)
    pub key: String,
    /// Issue title at fetch time
    pub summary: String,
}

impl IssueRef {
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
        }
    }
}

/// The issue was created inside the synchronized window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCreated {
    pub issue: IssueRef,
    pub timestamp: DateTime<Utc>,
    pub creator_name: String,
    pub description: String,
}

/// One item of a change-history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChanged {
    pub issue: IssueRef,
    pub timestamp: DateTime<Utc>,
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub author_key: String,
    pub author_name: String,
    /// Id of the history entry this item belongs to
    pub history_id: i64,
    /// Position of the item inside its history entry
    pub item_index: usize,
}

/// A comment was added inside the synchronized window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAdded {
    pub issue: IssueRef,
    pub timestamp: DateTime<Utc>,
    pub comment_id: String,
    pub author_name: String,
    pub body: String,
}

/// Typed change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    IssueCreated(IssueCreated),
    FieldChanged(FieldChanged),
    CommentAdded(CommentAdded),
}

/// Discriminant of [`Event`], mostly for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IssueCreated,
    FieldChanged,
    CommentAdded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::IssueCreated => "issue_created",
            EventKind::FieldChanged => "field_changed",
            EventKind::CommentAdded => "comment_added",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an event across re-deliveries.
///
/// The source may hand the same change over twice (items sharing the
/// watermark instant are re-fetched after a restart). Sinks that must apply
/// events idempotently upsert by this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NaturalKey {
    Issue {
        key: String,
    },
    Change {
        key: String,
        history_id: i64,
        item_index: usize,
    },
    Comment {
        key: String,
        comment_id: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::IssueCreated(_) => EventKind::IssueCreated,
            Event::FieldChanged(_) => EventKind::FieldChanged,
            Event::CommentAdded(_) => EventKind::CommentAdded,
        }
    }

    pub fn issue(&self) -> &IssueRef {
        match self {
            Event::IssueCreated(e) => &e.issue,
            Event::FieldChanged(e) => &e.issue,
            Event::CommentAdded(e) => &e.issue,
        }
    }

    pub fn issue_key(&self) -> &str {
        &self.issue().key
    }

    pub fn issue_summary(&self) -> &str {
        &self.issue().summary
    }

    pub fn natural_key(&self) -> NaturalKey {
        match self {
            Event::IssueCreated(e) => NaturalKey::Issue {
                key: e.issue.key.clone(),
            },
            Event::FieldChanged(e) => NaturalKey::Change {
                key: e.issue.key.clone(),
                history_id: e.history_id,
                item_index: e.item_index,
            },
            Event::CommentAdded(e) => NaturalKey::Comment {
                key: e.issue.key.clone(),
                comment_id: e.comment_id.clone(),
            },
        }
    }

    /// Instant the change happened in the source.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::IssueCreated(e) => e.timestamp,
            Event::FieldChanged(e) => e.timestamp,
            Event::CommentAdded(e) => e.timestamp,
        }
    }
}

impl From<IssueCreated> for Event {
    fn from(e: IssueCreated) -> Self {
        Event::IssueCreated(e)
    }
}

impl From<FieldChanged> for Event {
    fn from(e: FieldChanged) -> Self {
        Event::FieldChanged(e)
    }
}

impl From<CommentAdded> for Event {
    fn from(e: CommentAdded) -> Self {
        Event::CommentAdded(e)
    }
}
