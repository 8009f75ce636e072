//! Error types for sinks.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while a sink consumes events.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Starting or committing a transaction failed.
    #[error("failed to {stage} transaction: {source}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    /// Writing rendered output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// The destination answered but refused the delivery.
    #[error("{destination} rejected the delivery: {message}")]
    Rejected {
        destination: &'static str,
        message: String,
    },

    /// The event could not be applied.
    #[error("failed to record {what}: {source}")]
    Record {
        what: String,
        #[source]
        source: BoxError,
    },

    /// Any other backend failure.
    #[error("sink backend error: {0}")]
    Backend(#[source] BoxError),
}

impl SinkError {
    pub fn begin(source: impl Into<BoxError>) -> Self {
        SinkError::Transaction {
            stage: "begin",
            source: source.into(),
        }
    }

    pub fn commit(source: impl Into<BoxError>) -> Self {
        SinkError::Transaction {
            stage: "commit",
            source: source.into(),
        }
    }

    pub fn backend(source: impl Into<BoxError>) -> Self {
        SinkError::Backend(source.into())
    }
}
