//! PostgreSQL sink for issue-sync
//!
//! Mirrors fetched issues, their field changes and their comments into three
//! tables scoped by a selector (the filter fingerprint). Every write is an
//! upsert on the row's natural key, so re-delivering a page after an aborted
//! run leaves the tables unchanged.
//!
//! The same database also keeps the per-fingerprint watermark
//! ([`PgWatermarkStore`]).

mod schema;
mod sink;
mod watermark;

use std::sync::Arc;

use tokio_postgres::{Client, NoTls};

pub use schema::{ensure_schema, SCHEMA};
pub use sink::PgSink;
pub use watermark::PgWatermarkStore;

/// Connection settings for the `todb` destination.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl PgConfig {
    /// Key/value connection string accepted by `tokio_postgres::connect`.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} user={} password={} dbname={}",
            quote(&self.host),
            quote(&self.user),
            quote(&self.password),
            quote(&self.database)
        )
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Connect and drive the connection on a background task.
pub async fn connect(connection_string: &str) -> Result<Arc<Client>, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("PostgreSQL connection error: {e}");
        }
    });

    Ok(Arc::new(client))
}
