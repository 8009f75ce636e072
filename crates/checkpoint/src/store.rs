//! Watermark storage trait and errors
//!
//! This module defines the WatermarkStore trait for backend-agnostic
//! watermark storage operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use sync_core::Fingerprint;

/// Errors raised by watermark backends.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    /// Reading or writing the state file failed.
    #[error("watermark file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored value is not a Unix timestamp.
    #[error("watermark file {path} holds '{content}', expected Unix seconds")]
    Corrupt { path: PathBuf, content: String },

    /// Any other backend failure (e.g. a database error).
    #[error("watermark backend error: {0}")]
    Backend(String),
}

/// Trait for watermark storage operations.
///
/// This trait abstracts the storage backend, allowing the same driver logic
/// to work with:
/// - Filesystem storage (`FilesystemStore`)
/// - PostgreSQL (`PgWatermarkStore` in the postgresql-sink crate)
/// - In-memory storage for tests (`MemoryStore`)
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the watermark for a fingerprint.
    ///
    /// Returns None if nothing was stored yet; the caller decides the default.
    async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError>;

    /// Replace the watermark for a fingerprint.
    async fn put(
        &self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError>;
}

#[async_trait]
impl<T: WatermarkStore + ?Sized> WatermarkStore for Box<T> {
    async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        (**self).get(fingerprint).await
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        (**self).put(fingerprint, watermark).await
    }
}
