//! Test helpers: an issue JSON builder and an in-memory source.
//!
//! Used by this crate's tests and by the driver's integration tests.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{parse_jira_time, IssueRecord, IssueSource, SearchPage, SourceError};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

fn wire_time(ts: DateTime<Utc>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Builds issue JSON shaped like a search result entry.
#[derive(Debug, Clone)]
pub struct IssueJson {
    key: String,
    summary: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    creator: Option<String>,
    description: Option<String>,
    histories: Vec<Value>,
    comments: Vec<Value>,
}

impl IssueJson {
    /// A fresh issue whose update time equals its creation time.
    pub fn new(key: &str, summary: &str, created: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            summary: summary.to_string(),
            created,
            updated: created,
            creator: None,
            description: None,
            histories: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = updated;
        self
    }

    pub fn creator(mut self, name: &str) -> Self {
        self.creator = Some(name.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    /// Add a history entry authored by `jdoe`; items are `(field, from, to)`.
    pub fn history(
        self,
        id: i64,
        created: DateTime<Utc>,
        items: &[(&str, Option<&str>, Option<&str>)],
    ) -> Self {
        self.history_by(id, "jdoe", "John Doe", created, items)
    }

    pub fn history_by(
        mut self,
        id: i64,
        author_key: &str,
        author_name: &str,
        created: DateTime<Utc>,
        items: &[(&str, Option<&str>, Option<&str>)],
    ) -> Self {
        let items: Vec<Value> = items
            .iter()
            .map(|(field, from, to)| json!({"field": field, "fromString": from, "toString": to}))
            .collect();
        self.histories.push(json!({
            "id": id.to_string(),
            "author": {"key": author_key, "name": author_key, "displayName": author_name},
            "created": wire_time(created),
            "items": items,
        }));
        self
    }

    pub fn comment(mut self, id: &str, author: &str, body: &str, created: DateTime<Utc>) -> Self {
        self.comments.push(json!({
            "id": id,
            "author": {"name": author, "displayName": author},
            "body": body,
            "created": wire_time(created),
        }));
        self
    }

    pub fn build(&self) -> Value {
        json!({
            "key": self.key,
            "fields": {
                "summary": self.summary,
                "created": wire_time(self.created),
                "updated": wire_time(self.updated),
                "creator": self.creator.as_ref().map(|name| json!({"displayName": name})),
                "description": self.description,
                "comment": {"comments": self.comments},
            },
            "changelog": {"histories": self.histories},
        })
    }

    /// Parsed form of [`build`](Self::build).
    ///
    /// # Panics
    ///
    /// Panics if the built JSON does not parse, which indicates a bug in
    /// the builder.
    pub fn record(&self) -> IssueRecord {
        IssueRecord::from_value(self.build()).expect("builder produced an unparsable issue")
    }
}

/// One request seen by [`StaticSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub since: DateTime<Utc>,
    pub start_at: u64,
    pub filter: String,
}

/// In-memory [`IssueSource`] answering like the remote search.
///
/// Issues are ordered by update time, ties keeping insertion order; each
/// request skips `start_at` of the issues updated strictly after `since` and
/// returns up to `page_size` of the rest, with `total` set to the number of
/// matching issues. The filter is recorded but not evaluated.
#[derive(Debug, Clone)]
pub struct StaticSource {
    issues: Vec<(DateTime<Utc>, Value)>,
    page_size: usize,
    requests: Vec<PageRequest>,
    fail_on_request: Option<usize>,
}

impl StaticSource {
    pub fn new(issues: Vec<Value>, page_size: usize) -> Self {
        let mut issues: Vec<(DateTime<Utc>, Value)> = issues
            .into_iter()
            .map(|issue| (updated_of(&issue), issue))
            .collect();
        issues.sort_by_key(|(updated, _)| *updated);
        Self {
            issues,
            page_size,
            requests: Vec::new(),
            fail_on_request: None,
        }
    }

    /// Fail the `n`-th request (1-based) with a reported error.
    pub fn fail_on_request(mut self, n: usize) -> Self {
        self.fail_on_request = Some(n);
        self
    }

    /// Every request made so far.
    pub fn requests(&self) -> &[PageRequest] {
        &self.requests
    }
}

fn updated_of(issue: &Value) -> DateTime<Utc> {
    issue
        .pointer("/fields/updated")
        .and_then(Value::as_str)
        .and_then(|s| parse_jira_time(s).ok())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait::async_trait]
impl IssueSource for StaticSource {
    async fn fetch_page(
        &mut self,
        since: DateTime<Utc>,
        start_at: u64,
        filter: &str,
    ) -> Result<SearchPage, SourceError> {
        self.requests.push(PageRequest {
            since,
            start_at,
            filter: filter.to_string(),
        });
        if self.fail_on_request == Some(self.requests.len()) {
            return Err(SourceError::Reported("injected source failure".to_string()));
        }

        let matching: Vec<&Value> = self
            .issues
            .iter()
            .filter(|(updated, _)| *updated > since)
            .map(|(_, issue)| issue)
            .collect();

        Ok(SearchPage {
            start_at,
            max_results: self.page_size as u64,
            total: matching.len() as u64,
            issues: matching
                .into_iter()
                .skip(start_at as usize)
                .take(self.page_size)
                .cloned()
                .collect(),
            error_messages: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_static_source_pages_by_update_time() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let issues = (0..5)
            .rev()
            .map(|i| IssueJson::new(&format!("K-{i}"), "s", base + Duration::minutes(i)).build())
            .collect();
        let mut source = StaticSource::new(issues, 2);

        let page = source.fetch_page(base, 0, "f").await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.issues.len(), 2);
        assert_eq!(page.issues[0]["key"], "K-1");
        assert!(page.has_more());

        let page = source.fetch_page(base, 3, "f").await.unwrap();
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.issues[0]["key"], "K-4");
        assert!(!page.has_more());

        assert_eq!(
            source.requests()[0],
            PageRequest {
                since: base,
                start_at: 0,
                filter: "f".to_string()
            }
        );
    }
}
