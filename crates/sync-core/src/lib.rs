//! Core types for the issue-sync framework.
//!
//! This crate provides the foundational types shared by the source, the
//! sinks and the sync driver:
//!
//! - [`Fingerprint`] - Stable hash of a filter expression, used to namespace watermarks
//! - [`Event`] - Typed change extracted from one fetched issue record
//! - [`IssueSnapshot`] - Raw copy of a fetched issue for sinks that mirror issues
//! - [`IssueGroup`] - Presentation grouping used by buffering sinks
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── checkpoint           (watermark stores keyed by Fingerprint)
//!    ├─── issue-sink           (Sink trait consuming Event)
//!    ├─── jira-source          (produces Event from issue records)
//!    └─── console/slack/postgresql sinks
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use sync_core::{CommentAdded, Event, Fingerprint, IssueRef};
//!
//! let fingerprint = Fingerprint::of("project = HDDS");
//! assert_eq!(fingerprint.as_str().len(), 64);
//!
//! let event = Event::CommentAdded(CommentAdded {
//!     issue: IssueRef::new("HDDS-1", "Fix the scanner"),
//!     timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
//!     comment_id: "10001".to_string(),
//!     author_name: "Jane".to_string(),
//!     body: "LGTM".to_string(),
//! });
//! assert_eq!(event.issue_key(), "HDDS-1");
//! ```

pub mod event;
pub mod fingerprint;
pub mod group;
pub mod snapshot;

pub use event::{
    CommentAdded, Event, EventKind, FieldChanged, IssueCreated, IssueRef, NaturalKey,
};
pub use fingerprint::Fingerprint;
pub use group::{group_by_issue, sort_for_presentation, IssueGroup};
pub use snapshot::IssueSnapshot;
