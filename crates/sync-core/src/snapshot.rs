//! Raw issue snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The full fetched representation of one issue.
///
/// Handed to sinks alongside the extracted events so that mirroring sinks
/// can keep an up-to-date copy of every issue the query touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub key: String,
    pub updated: DateTime<Utc>,
    /// Issue JSON exactly as returned by the source
    pub raw: serde_json::Value,
}
