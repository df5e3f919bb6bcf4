//! Integration test: submit entries over HTTP and read the log back.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;
use quire_engine::EngineConfig;
use quire_engine::merkle::{self, empty_root, leaf_hash};
use quire_integration_tests::{TestLog, entry_uri};
use quire_store::TreeState;

#[tokio::test]
async fn test_fresh_log_serves_empty_checkpoint() {
    let log = TestLog::new().await;

    let checkpoint = log.fetch_checkpoint().await;
    assert_eq!(checkpoint.origin, "Test-Betty");
    assert_eq!(checkpoint.size, 0);
    assert_eq!(checkpoint.hash, empty_root().to_vec());

    let head = log.tree.current_tree().await.unwrap();
    assert_eq!(head.size, 0);
    assert_eq!(head.hash, empty_root().to_vec());
}

#[tokio::test]
async fn test_hello_world() {
    let log = TestLog::new().await;

    assert_eq!(log.add("hello").await, (StatusCode::OK, "0\n".to_string()));
    assert_eq!(log.add("world").await, (StatusCode::OK, "1\n".to_string()));

    log.wait_for_size(2).await;
    let checkpoint = log.fetch_checkpoint().await;
    assert_eq!(checkpoint.size, 2);
    assert_eq!(
        checkpoint.hash,
        merkle::root(&[leaf_hash(b"hello"), leaf_hash(b"world")]).to_vec()
    );

    let snap = log.latency.snapshot();
    assert_eq!(snap.count, 2);
    assert!(snap.min.is_some());
}

#[tokio::test]
async fn test_entries_are_served_as_files() {
    let log = TestLog::new().await;
    let payload = Bytes::from(vec![0u8, 1, 2, 0xff, b'\n']);
    let index = log.add_ok(payload.clone()).await;

    let (status, body) = log.get(&entry_uri(index)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, payload);

    let (status, _) = log.get(&entry_uri(index + 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sequential_adds_are_distinct_and_dense() {
    let log = TestLog::new().await;

    let mut indices = Vec::new();
    for i in 0..20 {
        indices.push(log.add_ok(format!("entry {i}")).await);
    }
    assert_eq!(indices, (0..20).collect::<Vec<u64>>());

    log.wait_for_size(20).await;
    assert_eq!(log.fetch_checkpoint().await.size, 20);
}

#[tokio::test]
async fn test_concurrent_adds_with_batching() {
    let log = Arc::new(
        TestLog::with_config(EngineConfig {
            batch_size: 8,
            batch_max_age: Duration::from_millis(20),
        })
        .await,
    );

    let mut handles = Vec::new();
    for i in 0..40 {
        let log = log.clone();
        handles.push(tokio::spawn(
            async move { log.add_ok(format!("concurrent {i}")).await },
        ));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        assert!(seen.insert(handle.await.unwrap()), "duplicate index");
    }
    assert_eq!(seen, (0..40).collect::<HashSet<u64>>());

    log.wait_for_size(40).await;

    // The published root covers exactly what was stored, in index order.
    let mut leaves = Vec::new();
    for index in 0..40 {
        let (status, body) = log.get(&entry_uri(index)).await;
        assert_eq!(status, StatusCode::OK);
        leaves.push(leaf_hash(&body));
    }
    let checkpoint = log.fetch_checkpoint().await;
    assert_eq!(checkpoint.hash, merkle::root(&leaves).to_vec());
}

#[tokio::test]
async fn test_empty_entry_is_accepted() {
    let log = TestLog::new().await;
    assert_eq!(log.add_ok(Bytes::new()).await, 0);
    log.wait_for_size(1).await;
    assert_eq!(
        log.fetch_checkpoint().await.hash,
        leaf_hash(b"").to_vec()
    );
}
