//! Jira source for issue-sync
//!
//! Provides the rate-limited search client, the JQL query builder, typed
//! issue records and the change extractor that turns one record into
//! `sync_core::Event` values.
//!
//! The incremental cursor is a timestamp: every page is requested with
//! `updated > <watermark> ORDER BY updated ASC`, and the caller advances the
//! watermark past each processed page. Because results are ascending, a new
//! query with the advanced watermark starts right after the imported lead-in,
//! so no page offset is needed.

mod client;
mod error;
mod extract;
mod models;
mod query;
mod source;
pub mod testing;
mod throttle;

pub use client::{JiraClient, JiraClientConfig};
pub use error::{ParseError, SourceError};
pub use extract::extract_events;
pub use models::{
    parse_jira_time, Comment, History, HistoryItem, IssueRecord, SearchPage, ANONYMOUS,
    JIRA_TIME_FORMAT,
};
pub use query::build_search_jql;
pub use source::IssueSource;
pub use throttle::Throttle;
