use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use smartcache_core::{
    BincodeFormat, CacheEntry, CacheKey, CachedResponse, ResponseStore, StoreError,
};
use smartcache_moka::{MokaStore, MokaStoreBuilder};

fn key(name: &str) -> CacheKey {
    CacheKey::digest(name.as_bytes())
}

fn response(body: impl Into<Bytes>) -> CachedResponse {
    CachedResponse::new(200, "application/json", body.into()).with_header("x-trace", "1")
}

#[tokio::test]
async fn test_get_after_put_returns_equal_entry() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("A"), Duration::from_secs(10)).unwrap();

    let entry = store.get(&key("a")).unwrap().unwrap();
    assert_eq!(entry.data(), &response("A"));
    assert!(entry.expires_at() > Utc::now());
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let store = MokaStore::builder().max_entries(100).build();
    assert!(store.get(&key("missing")).unwrap().is_none());
    assert!(store.get(&key("missing")).unwrap().is_none());

    store.put(&key("a"), response("A"), Duration::from_secs(10)).unwrap();
    let first = store.get(&key("a")).unwrap();
    let second = store.get(&key("a")).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_entry_disappears_after_ttl() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("A"), Duration::from_millis(300)).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.get(&key("a")).unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(store.get(&key("a")).unwrap().is_none());
}

/// Reads don't extend the lifetime of an entry.
#[tokio::test]
async fn test_reads_do_not_slide_expiry() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("A"), Duration::from_secs(60)).unwrap();

    let first = store.get(&key("a")).unwrap().unwrap().expires_at();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = store.get(&key("a")).unwrap().unwrap().expires_at();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_overwrite_replaces_entry_and_expiry() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("old"), Duration::from_millis(100)).unwrap();
    store.put(&key("a"), response("new"), Duration::from_secs(60)).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let entry = store.get(&key("a")).unwrap().unwrap();
    assert_eq!(entry.data().body, Bytes::from("new"));
}

#[tokio::test]
async fn test_zero_ttl_is_never_served() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("A"), Duration::ZERO).unwrap();
    assert!(store.get(&key("a")).unwrap().is_none());
}

#[tokio::test]
async fn test_remove_reports_presence() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put(&key("a"), response("A"), Duration::from_secs(10)).unwrap();

    assert!(store.remove(&key("a")).unwrap());
    assert!(!store.remove(&key("a")).unwrap());
    assert!(store.get(&key("a")).unwrap().is_none());
}

#[tokio::test]
async fn test_bincode_values_round_trip() {
    let store = MokaStoreBuilder::default()
        .label("binary")
        .max_entries(100)
        .value_format(BincodeFormat)
        .build();
    store.put(&key("a"), response("A"), Duration::from_secs(10)).unwrap();

    assert_eq!(store.label(), "binary");
    assert_eq!(store.get(&key("a")).unwrap().unwrap().into_inner(), response("A"));
}

#[tokio::test]
async fn test_corrupt_entry_is_read_error() {
    let store = MokaStore::builder().max_entries(100).build();
    store.put_raw(
        key("a"),
        CacheEntry::new(Bytes::from_static(b"not json"), Duration::from_secs(10)),
    );

    assert!(matches!(store.get(&key("a")), Err(StoreError::Read(_))));
}

#[tokio::test]
async fn test_byte_capacity_evicts() {
    let store = MokaStore::builder().max_bytes(2_000).build();
    for i in 0..50 {
        store
            .put(&key(&i.to_string()), response(format!("{i:0>100}")), Duration::from_secs(60))
            .unwrap();
    }
    store.cache().run_pending_tasks();

    assert!(store.cache().weighted_size() <= 2_000);
    assert!(store.cache().entry_count() < 50);
}
