//! Watermark management for issue-sync
//!
//! A watermark is the instant a query has been synchronized up to. It is
//! stored per [`Fingerprint`](sync_core::Fingerprint) so that different
//! filters never interfere with each other.
//!
//! # Architecture
//!
//! This crate provides a storage-agnostic watermark system that:
//! - Defines the `WatermarkStore` trait (`get` / `put` by fingerprint)
//! - Provides `FilesystemStore`, one Unix-seconds file per fingerprint
//! - Provides `MemoryStore` and `NullStore` for tests and display-only runs
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - `<dir>/<fingerprint>.state`, replaced atomically
//! - `MemoryStore` - process-local map
//! - `NullStore` - remembers nothing
//! - `PgWatermarkStore` - one row per fingerprint (in the postgresql-sink crate)
//!
//! The store is read once when a run starts and written once after the run
//! completes successfully. There is no locking: two runs against the same
//! fingerprint must not overlap.

mod filesystem;
mod memory;
pub mod store;

#[cfg(test)]
mod tests;

pub use filesystem::FilesystemStore;
pub use memory::{MemoryStore, NullStore};
pub use store::{WatermarkError, WatermarkStore};

use chrono::{DateTime, Utc};

/// Truncate a watermark to whole seconds.
///
/// Persisted watermarks have second precision. Truncating (never rounding up)
/// means a resumed run may re-read items from the same second, but it can
/// never skip one.
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}
