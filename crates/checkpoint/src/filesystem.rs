//! Filesystem-based watermark storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use sync_core::Fingerprint;

use crate::store::{WatermarkError, WatermarkStore};
use crate::truncate_to_seconds;

/// Filesystem implementation of WatermarkStore trait.
///
/// Stores one file per fingerprint, `<dir>/<fingerprint>.state`, whose only
/// content is the watermark as Unix seconds. Files are replaced atomically
/// (write to a temporary file in the same directory, then rename).
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    ///
    /// The directory is created lazily on the first `put`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for a fingerprint.
    pub fn state_file(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.state"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WatermarkError + '_ {
    move |source| WatermarkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl WatermarkStore for FilesystemStore {
    async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        let path = self.state_file(fingerprint);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No watermark file at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        let trimmed = content.trim();
        let secs: i64 = trimmed.parse().map_err(|_| WatermarkError::Corrupt {
            path: path.clone(),
            content: trimmed.to_string(),
        })?;
        let watermark =
            DateTime::from_timestamp(secs, 0).ok_or_else(|| WatermarkError::Corrupt {
                path: path.clone(),
                content: trimmed.to_string(),
            })?;

        tracing::debug!("Read watermark {} from {}", watermark, path.display());
        Ok(Some(watermark))
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        let watermark = truncate_to_seconds(watermark);
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        let path = self.state_file(fingerprint);
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(io_error(&self.dir))?;
        write!(tmp, "{}", watermark.timestamp()).map_err(io_error(&path))?;
        tmp.as_file().sync_all().map_err(io_error(&path))?;
        tmp.persist(&path).map_err(|e| io_error(&path)(e.error))?;

        tracing::info!("Stored watermark {} to {}", watermark, path.display());
        Ok(())
    }
}
