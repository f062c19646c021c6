//! Shared contract tests run against every `StorageEngine` implementation
//! (spec §8 "Testable properties" + invariants of §3/§4.3), so the trait
//! boundary is verified structurally rather than by inspection alone.

use std::collections::HashMap;

use super::memory::MemoryEngine;
use super::{Order, StorageEngine};

async fn run_contract(engine: &dyn StorageEngine) {
    let tenant = "acme";

    // Round-trip: post then immediately read back exactly one sample.
    engine.post_raw_data(tenant, "cpu", 1_000, 42.0).await.unwrap();
    let read = engine
        .get_raw_data(tenant, "cpu", 1_001, 1_000, 1, Order::Asc)
        .await
        .unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].timestamp, 1_000);
    assert_eq!(read[0].value, 42.0);

    // Range invariant: start <= ts < end, size <= limit, correct order.
    for (ts, v) in [(1_000, 1.0), (2_000, 2.0), (3_000, 3.0), (4_000, 4.0)] {
        engine.post_raw_data(tenant, "range", ts, v).await.unwrap();
    }
    let asc = engine
        .get_raw_data(tenant, "range", 4_000, 1_000, 10, Order::Asc)
        .await
        .unwrap();
    assert_eq!(asc.iter().map(|s| s.timestamp).collect::<Vec<_>>(), vec![1_000, 2_000, 3_000]);

    let desc = engine
        .get_raw_data(tenant, "range", 4_000, 1_000, 10, Order::Desc)
        .await
        .unwrap();
    assert_eq!(desc.iter().map(|s| s.timestamp).collect::<Vec<_>>(), vec![3_000, 2_000, 1_000]);

    let limited = engine
        .get_raw_data(tenant, "range", 4_000, 1_000, 2, Order::Asc)
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    // Bucket tiling: boundaries cover [start, end) exactly.
    let buckets = engine
        .get_stat_data(tenant, "range", 4_000, 1_000, 10, Order::Asc, 1_000)
        .await
        .unwrap();
    assert_eq!(buckets.len(), 3);
    for (i, bucket) in buckets.iter().enumerate() {
        assert_eq!(bucket.end - bucket.start, 1_000);
        assert_eq!(bucket.start, 1_000 + (i as i64) * 1_000);
    }

    // Idempotent tags: two identical puts equal one put.
    let mut tags = HashMap::new();
    tags.insert("unit".to_string(), "celsius".to_string());
    engine.put_tags(tenant, "cpu", tags.clone()).await.unwrap();
    engine.put_tags(tenant, "cpu", tags.clone()).await.unwrap();
    let items = engine.get_item_list(tenant, &HashMap::new()).await.unwrap();
    let cpu_item = items.iter().find(|i| i.id == "cpu").unwrap();
    assert_eq!(cpu_item.tags, tags);

    // Tag-filter monotonicity: narrowing the query never adds results.
    let mut narrow = HashMap::new();
    narrow.insert("unit".to_string(), "celsius".to_string());
    let narrow_results = engine.get_item_list(tenant, &narrow).await.unwrap();
    let wide_results = engine.get_item_list(tenant, &HashMap::new()).await.unwrap();
    assert!(narrow_results.len() <= wide_results.len());

    // Delete removes only the targeted range.
    engine.delete_data(tenant, "range", 2_000, 1_000).await.unwrap();
    let after_delete = engine
        .get_raw_data(tenant, "range", 4_000, 1_000, 10, Order::Asc)
        .await
        .unwrap();
    assert_eq!(
        after_delete.iter().map(|s| s.timestamp).collect::<Vec<_>>(),
        vec![2_000, 3_000]
    );

    // Delete tags removes only the listed keys.
    engine
        .delete_tags(tenant, "cpu", &["unit".to_string()])
        .await
        .unwrap();
    let items = engine.get_item_list(tenant, &HashMap::new()).await.unwrap();
    let cpu_item = items.iter().find(|i| i.id == "cpu").unwrap();
    assert!(cpu_item.tags.is_empty());
}

#[tokio::test]
async fn memory_engine_satisfies_contract() {
    let engine = MemoryEngine::new();
    run_contract(&engine).await;
}

#[tokio::test]
async fn sqlite_engine_satisfies_contract() {
    let engine = super::sqlite::SqliteEngine::open("sqlite::memory:").await.unwrap();
    run_contract(&engine).await;
}

#[tokio::test]
async fn document_engine_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let engine = super::document::DocumentEngine::open(dir.path()).await.unwrap();
    run_contract(&engine).await;
}

#[tokio::test]
async fn rejects_non_finite_sample_values() {
    let engine = MemoryEngine::new();
    let err = engine.post_raw_data("acme", "bad", 0, f64::NAN).await;
    assert!(err.is_err());
    let err = engine.post_raw_data("acme", "bad", 0, f64::INFINITY).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn unknown_tenant_returns_empty_not_error() {
    let engine = MemoryEngine::new();
    let items = engine
        .get_item_list("nonexistent", &HashMap::new())
        .await
        .unwrap();
    assert!(items.is_empty());
    let samples = engine
        .get_raw_data("nonexistent", "id", 100, 0, 10, Order::Asc)
        .await
        .unwrap();
    assert!(samples.is_empty());
}
