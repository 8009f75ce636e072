//! Error types for the Jira source.

use thiserror::Error;

/// Errors raised while fetching a page from the source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Connection failure, timeout or other transport problem.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with a 4xx or 5xx status.
    #[error("source responded with HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// A successful response carrying error messages; holds the first one.
    #[error("source reported an error: {0}")]
    Reported(String),

    /// The response body is not a search result.
    #[error("failed to decode search response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors raised while turning raw issue JSON into an [`IssueRecord`](crate::IssueRecord).
#[derive(Error, Debug)]
pub enum ParseError {
    /// A required field is missing or has the wrong type.
    #[error("malformed issue record {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A timestamp does not follow the source's format.
    #[error("issue {key}: invalid timestamp in {field}: '{value}'")]
    Timestamp {
        key: String,
        field: String,
        value: String,
    },

    /// A history entry id is not numeric.
    #[error("issue {key}: history id '{value}' is not numeric")]
    HistoryId { key: String, value: String },
}
