//! Watermark rows in `issue_sync_watermark`.

use std::sync::Arc;

use async_trait::async_trait;
use checkpoint::{WatermarkError, WatermarkStore};
use chrono::{DateTime, Utc};
use sync_core::Fingerprint;
use tokio_postgres::Client;

pub(crate) async fn upsert_watermark(
    client: &Client,
    fingerprint: &Fingerprint,
    watermark: DateTime<Utc>,
) -> Result<u64, tokio_postgres::Error> {
    client
        .execute(
            "INSERT INTO issue_sync_watermark (fingerprint, updated) VALUES ($1, $2)
             ON CONFLICT (fingerprint) DO UPDATE SET updated = EXCLUDED.updated",
            &[&fingerprint.as_str(), &watermark],
        )
        .await
}

/// Watermark store backed by the sink's database.
pub struct PgWatermarkStore {
    client: Arc<Client>,
}

impl PgWatermarkStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

fn backend(e: tokio_postgres::Error) -> WatermarkError {
    WatermarkError::Backend(e.to_string())
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    async fn get(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        let row = self
            .client
            .query_opt(
                "SELECT updated FROM issue_sync_watermark WHERE fingerprint = $1",
                &[&fingerprint.as_str()],
            )
            .await
            .map_err(backend)?;
        row.map(|r| r.try_get::<_, DateTime<Utc>>(0))
            .transpose()
            .map_err(backend)
    }

    async fn put(
        &self,
        fingerprint: &Fingerprint,
        watermark: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        upsert_watermark(&self.client, fingerprint, watermark)
            .await
            .map_err(backend)?;
        tracing::info!("Stored watermark {watermark} for {fingerprint}");
        Ok(())
    }
}
