//! Errors returned by the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why `POST /add` failed.
#[derive(Debug, thiserror::Error)]
pub enum AddError {
    /// The request body could not be read.
    #[error("failed to read request body")]
    Body {
        /// Status to answer with.
        status: StatusCode,
    },

    /// The sequencer did not commit the entry.
    #[error("Failed to sequence entry: {0}")]
    Sequence(#[from] quire_engine::EngineError),
}

impl IntoResponse for AddError {
    fn into_response(self) -> Response {
        match &self {
            // Body failures carry no message.
            Self::Body { status } => (*status).into_response(),
            Self::Sequence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}
