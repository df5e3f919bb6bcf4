//! Shared test harness for Quire integration tests.
//!
//! Provides [`TestLog`], the full file-backed stack (signed checkpoint,
//! log engine, HTTP router) rooted in a temporary directory, driven through
//! the router exactly as a client would.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use quire_engine::merkle::empty_root;
use quire_engine::{EngineConfig, EngineError, FileEntryStore, LogEngine};
use quire_http::{DEFAULT_MAX_BODY_BYTES, Latency, LogServer, LogServerConfig};
use quire_note::{NoteSigner, NoteVerifier};
use quire_store::{Checkpoint, FileStore, SignedTreeState, TreeState, parse_and_verify};
use tempfile::TempDir;
use tower::ServiceExt;

/// Test signer key; origin `Test-Betty`.
pub const TEST_SIGNER: &str =
    "PRIVATE+KEY+Test-Betty+df84580a+Afge8kCzBXU7jb3cV2Q363oNXCufJ6u9mjOY1BGRY9E2";

/// Verifier matching [`TEST_SIGNER`].
pub const TEST_VERIFIER: &str = "Test-Betty+df84580a+AQQASqPUZoIHcJAF5mBOryctwFdTV1E0GRY4kEAtTzwB";

pub type Tree = SignedTreeState<FileStore>;

/// Parse the test key pair.
pub fn test_keys() -> (NoteSigner, NoteVerifier) {
    (
        NoteSigner::parse(TEST_SIGNER).unwrap(),
        NoteVerifier::parse(TEST_VERIFIER).unwrap(),
    )
}

/// Bring up the checkpoint and engine over `root` the way the daemon does.
pub async fn open_stack(
    root: &Path,
    config: EngineConfig,
) -> Result<(Arc<Tree>, Arc<LogEngine>), EngineError> {
    let (signer, verifier) = test_keys();
    let tree = Arc::new(SignedTreeState::new(FileStore::new(root)?, signer, verifier)?);
    tree.initialize(&empty_root()).await?;
    let entries = Arc::new(FileEntryStore::new(root)?);
    let engine = Arc::new(LogEngine::open(entries, tree.clone(), config).await?);
    Ok((tree, engine))
}

/// A running log in a temporary directory.
pub struct TestLog {
    pub dir: TempDir,
    pub tree: Arc<Tree>,
    pub engine: Arc<LogEngine>,
    pub latency: Arc<Latency>,
    config: EngineConfig,
    router: Router,
}

impl TestLog {
    /// A fresh log with default batching.
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    /// A fresh log with the given batching.
    pub async fn with_config(config: EngineConfig) -> Self {
        Self::open_in(tempfile::tempdir().unwrap(), config).await
    }

    async fn open_in(dir: TempDir, config: EngineConfig) -> Self {
        let (tree, engine) = open_stack(dir.path(), config.clone()).await.unwrap();
        let latency = Arc::new(Latency::new());
        let router = LogServer::new(LogServerConfig {
            sequencer: engine.clone(),
            latency: latency.clone(),
            root: dir.path().to_path_buf(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
        .into_router();
        Self {
            dir,
            tree,
            engine,
            latency,
            config,
            router,
        }
    }

    /// The log root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Flush and stop the engine, then bring the whole stack up again over
    /// the same directory.
    pub async fn restart(self) -> Self {
        self.engine.shutdown().await;
        let Self { dir, config, .. } = self;
        Self::open_in(dir, config).await
    }

    /// Flush and stop the engine, keeping the directory.
    pub async fn stop(self) -> TempDir {
        self.engine.shutdown().await;
        self.dir
    }

    /// `POST /add` with `body`.
    pub async fn add(&self, body: impl Into<Body>) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// `POST /add` expecting success; returns the index.
    pub async fn add_ok(&self, body: impl Into<Body>) -> u64 {
        let (status, text) = self.add(body).await;
        assert_eq!(status, StatusCode::OK, "add failed: {text}");
        text.strip_suffix('\n').unwrap().parse().unwrap()
    }

    /// `GET` a path from the static file tree.
    pub async fn get(&self, uri: &str) -> (StatusCode, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, response.into_body().collect().await.unwrap().to_bytes())
    }

    /// Fetch `/checkpoint` over HTTP and verify it.
    pub async fn fetch_checkpoint(&self) -> Checkpoint {
        let (status, bytes) = self.get("/checkpoint").await;
        assert_eq!(status, StatusCode::OK);
        parse_and_verify(&bytes, &test_keys().1).unwrap()
    }

    /// Wait until the published checkpoint covers at least `size` entries.
    ///
    /// Publication follows the `/add` response, so tests that inspect the
    /// checkpoint must wait for it.
    pub async fn wait_for_size(&self, size: u64) {
        let wait = async {
            loop {
                if self.tree.current_tree().await.unwrap().size >= size {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .unwrap_or_else(|_| panic!("checkpoint never reached size {size}"));
    }
}

/// Entry file path relative to the log root, as served over HTTP.
pub fn entry_uri(index: u64) -> String {
    let hex = format!("{index:016x}");
    format!("/entries/{}/{}/{}", &hex[0..12], &hex[12..14], hex)
}
