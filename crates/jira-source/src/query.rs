//! JQL construction.

use chrono::{DateTime, Utc};

/// Build the search query for issues updated strictly after `since`.
///
/// The timestamp is rendered as epoch milliseconds, clamped at zero. A
/// non-empty `filter` is parenthesised and AND-ed in front of the
/// ordering clause.
pub fn build_search_jql(since: DateTime<Utc>, filter: &str) -> String {
    let since_ms = since.timestamp_millis().max(0);
    let incremental = format!("updated > {since_ms} ORDER BY updated ASC");
    let filter = filter.trim();
    if filter.is_empty() {
        incremental
    } else {
        format!("({filter}) AND {incremental}")
    }
}
