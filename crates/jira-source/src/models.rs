//! Search responses and issue records.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sync_core::IssueSnapshot;

use crate::ParseError;

/// Timestamp layout used by Jira, e.g. `2024-05-01T10:00:00.000+0000`.
pub const JIRA_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Author name used when the source omits the author.
pub const ANONYMOUS: &str = "Anonymous";

/// Parse a source timestamp, accepting RFC 3339 as well.
pub fn parse_jira_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(value, JIRA_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
}

/// One page of search results.
///
/// Issues stay raw until the driver parses them, so a malformed record
/// surfaces as a [`ParseError`] instead of failing the whole page decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<Value>,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

impl SearchPage {
    /// Whether more results exist beyond this page.
    pub fn has_more(&self) -> bool {
        self.start_at + self.max_results < self.total
    }
}

/// A parsed issue with its change history and comments.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub creator_name: String,
    pub description: String,
    pub histories: Vec<History>,
    pub comments: Vec<Comment>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub id: i64,
    pub author_key: String,
    pub author_name: String,
    pub created: DateTime<Utc>,
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author_name: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl IssueRecord {
    /// Parse one element of a search page's `issues` array.
    pub fn from_value(raw: Value) -> Result<Self, ParseError> {
        let key = raw
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();
        let wire = WireIssue::deserialize(&raw).map_err(|source| ParseError::Malformed {
            key: key.clone(),
            source,
        })?;

        let time = |field: &str, value: &str| {
            parse_jira_time(value).map_err(|_| ParseError::Timestamp {
                key: key.clone(),
                field: field.to_string(),
                value: value.to_string(),
            })
        };

        let created = time("created", &wire.fields.created)?;
        let updated = time("updated", &wire.fields.updated)?;

        let histories = wire
            .changelog
            .map(|c| c.histories)
            .unwrap_or_default()
            .into_iter()
            .map(|h| {
                let id = h.id.parse::<i64>().map_err(|_| ParseError::HistoryId {
                    key: key.clone(),
                    value: h.id.clone(),
                })?;
                let (author_key, author_name) = match h.author {
                    Some(author) => (author.identity(), author.display()),
                    None => (String::new(), ANONYMOUS.to_string()),
                };
                Ok(History {
                    id,
                    author_key,
                    author_name,
                    created: time("changelog.histories.created", &h.created)?,
                    items: h
                        .items
                        .into_iter()
                        .map(|i| HistoryItem {
                            field: i.field,
                            from: i.from_string,
                            to: i.to_string,
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        let comments = wire
            .fields
            .comment
            .map(|c| c.comments)
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                Ok(Comment {
                    created: time("comment.created", &c.created)?,
                    id: c.id,
                    author_name: c.author.map_or_else(|| ANONYMOUS.to_string(), |a| a.display()),
                    body: c.body.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(IssueRecord {
            key: wire.key,
            summary: wire.fields.summary,
            created,
            updated,
            creator_name: wire
                .fields
                .creator
                .map_or_else(|| ANONYMOUS.to_string(), |u| u.display()),
            description: wire.fields.description.unwrap_or_default(),
            histories,
            comments,
            raw,
        })
    }

    /// Raw mirror of this issue for sinks that keep one.
    pub fn snapshot(&self) -> IssueSnapshot {
        IssueSnapshot {
            key: self.key.clone(),
            updated: self.updated,
            raw: self.raw.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WireIssue {
    key: String,
    fields: WireFields,
    #[serde(default)]
    changelog: Option<WireChangelog>,
}

#[derive(Deserialize)]
struct WireFields {
    summary: String,
    created: String,
    updated: String,
    #[serde(default)]
    creator: Option<WireUser>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    comment: Option<WireComments>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl WireUser {
    fn identity(&self) -> String {
        self.key
            .as_ref()
            .or(self.name.as_ref())
            .or(self.account_id.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn display(self) -> String {
        self.display_name
            .or(self.name)
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }
}

#[derive(Deserialize)]
struct WireChangelog {
    #[serde(default)]
    histories: Vec<WireHistory>,
}

#[derive(Deserialize)]
struct WireHistory {
    id: String,
    #[serde(default)]
    author: Option<WireUser>,
    created: String,
    #[serde(default)]
    items: Vec<WireItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    field: String,
    #[serde(default)]
    from_string: Option<String>,
    #[serde(default)]
    to_string: Option<String>,
}

#[derive(Deserialize)]
struct WireComments {
    #[serde(default)]
    comments: Vec<WireComment>,
}

#[derive(Deserialize)]
struct WireComment {
    id: String,
    #[serde(default)]
    author: Option<WireUser>,
    #[serde(default)]
    body: Option<String>,
    created: String,
}
