//! In-process watermark stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use sync_core::Fingerprint;

use crate::store::{WatermarkError, WatermarkStore};

/// Watermark store backed by a map, for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    watermarks: Mutex<HashMap<Fingerprint, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds one watermark.
    pub fn with(fingerprint: Fingerprint, watermark: DateTime<Utc>) -> Self {
        let store = Self::default();
        store
            .watermarks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint, watermark);
        store
    }

    /// Synchronous peek, handy in assertions.
    pub fn snapshot(&self, fingerprint: &Fingerprint) -> Option<DateTime<Utc>> {
        self.watermarks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(fingerprint)
            .copied()
    }
}

#[async_trait]
impl WatermarkStore for MemoryStore {
    async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        Ok(self.snapshot(fingerprint))
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        self.watermarks
            .lock()
            .map_err(|e| WatermarkError::Backend(e.to_string()))?
            .insert(fingerprint.clone(), watermark);
        Ok(())
    }
}

/// Store that never remembers anything.
///
/// Used by display-only runs whose sink supplies its own starting point.
pub struct NullStore;

#[async_trait]
impl WatermarkStore for NullStore {
    async fn get(
        &self,
        _fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        Ok(None)
    }

    async fn put(
        &self,
        _fingerprint: &Fingerprint,
        _watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        Ok(())
    }
}
