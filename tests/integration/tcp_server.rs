//! Integration test: the log server over a real TCP socket.

use std::sync::Arc;

use quire_engine::EngineConfig;
use quire_http::{DEFAULT_MAX_BODY_BYTES, Latency, LogServer, LogServerConfig};
use quire_integration_tests::open_stack;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Send one HTTP/1.1 request and return the raw response.
async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_serve_and_graceful_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (_tree, engine) = open_stack(dir.path(), EngineConfig::default())
        .await
        .unwrap();

    let server = LogServer::new(LogServerConfig {
        sequencer: engine.clone(),
        latency: Arc::new(Latency::new()),
        root: dir.path().to_path_buf(),
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let serve = tokio::spawn(server.serve(listener, async move {
        let _ = shutdown_rx.changed().await;
    }));

    let response = roundtrip(
        addr,
        "POST /add HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("\r\n\r\n0\n"), "{response}");

    let response = roundtrip(
        addr,
        "GET /checkpoint HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("Test-Betty\n"), "{response}");

    shutdown_tx.send(true).unwrap();
    serve.await.unwrap().unwrap();
    engine.shutdown().await;
}
