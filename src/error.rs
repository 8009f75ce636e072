//! Error classification at the driver boundary.

use checkpoint::WatermarkError;
use issue_sink::SinkError;
use issue_sync_jira_source::{ParseError, SourceError};
use thiserror::Error;

/// Any failure that ends a sync run.
///
/// There is no recoverable tier: every variant aborts the run and leaves the
/// persisted watermark untouched. Pages committed before the failure stay
/// committed.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure, error status or source-reported error.
    #[error("source request failed")]
    Source(#[from] SourceError),

    /// A fetched issue record is malformed.
    #[error("failed to parse issue record")]
    Parse(#[from] ParseError),

    /// The sink refused a transaction boundary, an event or its output.
    #[error("sink failed")]
    Sink(#[from] SinkError),

    /// Reading or writing the persisted watermark failed.
    #[error("watermark store failed")]
    Watermark(#[from] WatermarkError),

    /// The start override is neither `last`, empty nor Unix epoch seconds.
    #[error("invalid --since value '{0}': expected 'last', empty or Unix epoch seconds")]
    InvalidSince(String),
}

impl SyncError {
    /// Name of the error category, used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Source(SourceError::Reported(_)) => "source-reported",
            SyncError::Source(_) => "transport",
            SyncError::Parse(_) => "parse",
            SyncError::Sink(_) => "sink",
            SyncError::Watermark(_) => "watermark",
            SyncError::InvalidSince(_) => "configuration",
        }
    }

    /// Whether the run must stop. Every category is fatal.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = SyncError::from(SourceError::Reported("bad jql".to_string()));
        assert_eq!(err.category(), "source-reported");
        assert!(err.is_fatal());

        let err = SyncError::from(SinkError::commit("disk full"));
        assert_eq!(err.category(), "sink");
        assert!(err.is_fatal());

        let err = SyncError::InvalidSince("yesterday".to_string());
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_source_chain_is_preserved() {
        let err = SyncError::from(SourceError::Reported("bad jql".to_string()));
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(
            chain,
            "source request failed: source reported an error: bad jql"
        );
    }
}
