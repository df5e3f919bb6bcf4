//! Integration test: restarts, crash recovery and corrupted state.

use quire_engine::merkle::{self, leaf_hash};
use quire_engine::{EngineConfig, EngineError};
use quire_integration_tests::{TestLog, open_stack};
use quire_note::NoteSigner;
use quire_store::{CHECKPOINT_FILE, CheckpointError, FileStore, SignedTreeState};

#[tokio::test]
async fn test_restart_continues_numbering() {
    let log = TestLog::new().await;
    for i in 0..3 {
        assert_eq!(log.add_ok(format!("before {i}")).await, i);
    }

    let log = log.restart().await;
    assert_eq!(log.fetch_checkpoint().await.size, 3);
    assert_eq!(log.add_ok("after").await, 3);

    log.wait_for_size(4).await;
    let expected = merkle::root(&[
        leaf_hash(b"before 0"),
        leaf_hash(b"before 1"),
        leaf_hash(b"before 2"),
        leaf_hash(b"after"),
    ]);
    assert_eq!(log.fetch_checkpoint().await.hash, expected.to_vec());
}

#[tokio::test]
async fn test_entries_written_after_last_checkpoint_are_recovered() {
    let log = TestLog::new().await;
    log.add_ok("published").await;
    let dir = log.stop().await;

    // Simulate a crash between storing an entry and publishing: the entry
    // file exists but the checkpoint still says size 1.
    let entries = quire_engine::FileEntryStore::new(dir.path()).unwrap();
    std::fs::create_dir_all(entries.entry_path(1).parent().unwrap()).unwrap();
    std::fs::write(entries.entry_path(1), "durable").unwrap();

    let (tree, engine) = open_stack(dir.path(), EngineConfig::default())
        .await
        .unwrap();
    let head = quire_store::TreeState::current_tree(tree.as_ref())
        .await
        .unwrap();
    assert_eq!(head.size, 2);
    assert_eq!(
        head.hash,
        merkle::root(&[leaf_hash(b"published"), leaf_hash(b"durable")]).to_vec()
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_fatal() {
    let log = TestLog::new().await;
    log.add_ok("something").await;
    let dir = log.stop().await;

    std::fs::write(dir.path().join(CHECKPOINT_FILE), "garbage").unwrap();

    let result = open_stack(dir.path(), EngineConfig::default()).await;
    assert!(
        matches!(
            result,
            Err(EngineError::Checkpoint(CheckpointError::Invalid { .. }))
        ),
        "corrupt checkpoint must not be treated as a fresh log"
    );
    // Nothing was overwritten.
    assert_eq!(
        std::fs::read(dir.path().join(CHECKPOINT_FILE)).unwrap(),
        b"garbage"
    );
}

#[tokio::test]
async fn test_tampered_entry_is_detected() {
    let log = TestLog::new().await;
    log.add_ok("original").await;
    log.add_ok("second").await;
    let dir = log.stop().await;

    let entries = quire_engine::FileEntryStore::new(dir.path()).unwrap();
    std::fs::write(entries.entry_path(0), "rewritten").unwrap();

    let result = open_stack(dir.path(), EngineConfig::default()).await;
    assert!(
        matches!(result, Err(EngineError::RootMismatch { size: 2, .. })),
        "tampered entry must fail the root check"
    );
}

#[tokio::test]
async fn test_missing_entry_is_detected() {
    let log = TestLog::new().await;
    log.add_ok("only").await;
    let dir = log.stop().await;

    let entries = quire_engine::FileEntryStore::new(dir.path()).unwrap();
    std::fs::remove_file(entries.entry_path(0)).unwrap();

    let result = open_stack(dir.path(), EngineConfig::default()).await;
    assert!(matches!(
        result,
        Err(EngineError::MissingEntry { index: 0, size: 1 })
    ));
}

#[tokio::test]
async fn test_checkpoint_from_another_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    // Another log with the same origin name but a different key.
    let impostor = NoteSigner::from_seed("Test-Betty", &[9u8; 32]).unwrap();
    let verifier = impostor.verifier();
    let tree = SignedTreeState::new(FileStore::new(dir.path()).unwrap(), impostor, verifier)
        .unwrap();
    tree.initialize(&merkle::empty_root()).await.unwrap();

    let result = open_stack(dir.path(), EngineConfig::default()).await;
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::Invalid { .. }))
    ));
}
