//! HTTP front-end for a Quire log.
//!
//! Provides a [`LogServer`] exposing:
//!
//! - `POST /add`: sequence the request body, answer `"<index>\n"`.
//!   Sequencing failures answer `500` with `Failed to sequence entry: <error>`.
//! - `GET /{*path}`: static files from the log root (the checkpoint and the
//!   entry tree).
//!
//! Every `/add` call, successful or not, is timed into a shared [`Latency`].

mod error;
mod handlers;
mod latency;


use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use quire_engine::Sequencer;
use tower_http::services::ServeDir;

pub use error::AddError;
pub use latency::{Latency, LatencySnapshot, LatencyTimer};

/// Default limit on `POST /add` bodies: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub sequencer: Arc<dyn Sequencer>,
    pub latency: Arc<Latency>,
}

/// Configuration for creating a [`LogServer`].
pub struct LogServerConfig {
    /// Assigns indices to submitted entries.
    pub sequencer: Arc<dyn Sequencer>,
    /// Aggregator every `/add` call is timed into.
    pub latency: Arc<Latency>,
    /// Directory served for `GET` requests.
    pub root: PathBuf,
    /// Largest accepted `/add` body.
    pub max_body_bytes: usize,
}

/// HTTP server for a log.
pub struct LogServer {
    router: Router,
}

impl LogServer {
    /// Create a server with the given configuration.
    pub fn new(config: LogServerConfig) -> Self {
        let state = AppState {
            sequencer: config.sequencer,
            latency: config.latency,
        };

        let router = Router::new()
            .route("/add", post(handlers::add_entry))
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .with_state(state)
            .fallback_service(ServeDir::new(config.root));

        Self { router }
    }

    /// Return the inner [`Router`] (useful for testing with `tower::ServiceExt`).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` completes, then wait for
    /// in-flight requests.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "log server listening");
        }
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
