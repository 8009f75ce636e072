//! Unit tests for the checkpoint crate.

use chrono::{DateTime, TimeZone, Utc};
use sync_core::Fingerprint;
use tempfile::TempDir;

use crate::{
    truncate_to_seconds, FilesystemStore, MemoryStore, NullStore, WatermarkError, WatermarkStore,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// ============================================================================
// FilesystemStore Tests
// ============================================================================

#[tokio::test]
async fn test_filesystem_missing_file_is_none() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());

    let loaded = store.get(&Fingerprint::of("project = A")).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_filesystem_put_then_get() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path().join("nested").join("state"));
    let fp = Fingerprint::of("project = A");

    store.put(&fp, ts(1_700_000_000)).await.unwrap();
    let loaded = store.get(&fp).await.unwrap();

    assert_eq!(loaded, Some(ts(1_700_000_000)));
}

#[tokio::test]
async fn test_filesystem_file_format_is_unix_seconds() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let fp = Fingerprint::of("");

    store.put(&fp, ts(1_600_000_123)).await.unwrap();

    let path = tmp.path().join(format!("{}.state", fp.as_str()));
    assert_eq!(store.state_file(&fp), path);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "1600000123");
}

#[tokio::test]
async fn test_filesystem_tolerates_trailing_newline() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let fp = Fingerprint::of("x");
    std::fs::write(store.state_file(&fp), "1500000000\n").unwrap();

    assert_eq!(store.get(&fp).await.unwrap(), Some(ts(1_500_000_000)));
}

#[tokio::test]
async fn test_filesystem_sub_second_precision_is_dropped() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let fp = Fingerprint::of("x");
    let precise = Utc.timestamp_opt(1_700_000_000, 999_000_000).unwrap();

    store.put(&fp, precise).await.unwrap();

    assert_eq!(store.get(&fp).await.unwrap(), Some(ts(1_700_000_000)));
}

#[tokio::test]
async fn test_filesystem_fingerprints_are_isolated() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let a = Fingerprint::of("project = A");
    let b = Fingerprint::of("project = B");

    store.put(&a, ts(100)).await.unwrap();
    store.put(&b, ts(200)).await.unwrap();
    store.put(&a, ts(150)).await.unwrap();

    assert_eq!(store.get(&a).await.unwrap(), Some(ts(150)));
    assert_eq!(store.get(&b).await.unwrap(), Some(ts(200)));
}

#[tokio::test]
async fn test_filesystem_corrupt_file() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let fp = Fingerprint::of("x");
    std::fs::write(store.state_file(&fp), "yesterday").unwrap();

    let err = store.get(&fp).await.unwrap_err();
    assert!(matches!(err, WatermarkError::Corrupt { ref content, .. } if content == "yesterday"));
    assert!(err.to_string().contains("expected Unix seconds"));
}

#[tokio::test]
async fn test_filesystem_overwrite_leaves_no_temp_files() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let fp = Fingerprint::of("x");

    store.put(&fp, ts(1)).await.unwrap();
    store.put(&fp, ts(2)).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

// ============================================================================
// MemoryStore / NullStore Tests
// ============================================================================

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    let fp = Fingerprint::of("x");
    assert!(store.get(&fp).await.unwrap().is_none());

    store.put(&fp, ts(42)).await.unwrap();
    assert_eq!(store.get(&fp).await.unwrap(), Some(ts(42)));
    assert_eq!(store.snapshot(&fp), Some(ts(42)));
}

#[tokio::test]
async fn test_memory_store_with_initial_value() {
    let fp = Fingerprint::of("x");
    let store = MemoryStore::with(fp.clone(), ts(7));
    assert_eq!(store.get(&fp).await.unwrap(), Some(ts(7)));
}

#[tokio::test]
async fn test_null_store_forgets() {
    let store = NullStore;
    let fp = Fingerprint::of("x");
    store.put(&fp, ts(42)).await.unwrap();
    assert!(store.get(&fp).await.unwrap().is_none());
}

#[tokio::test]
async fn test_boxed_store_delegates() {
    let store: Box<dyn WatermarkStore> = Box::new(MemoryStore::new());
    let fp = Fingerprint::of("x");
    store.put(&fp, ts(9)).await.unwrap();
    assert_eq!(store.get(&fp).await.unwrap(), Some(ts(9)));
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn test_truncate_to_seconds() {
    let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    assert_eq!(truncate_to_seconds(precise), ts(1_700_000_000));
    assert_eq!(truncate_to_seconds(ts(5)), ts(5));
}
