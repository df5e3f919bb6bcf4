//! Request handlers.

use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::AddError;

/// `POST /add`: sequence the body and answer with `"<index>\n"`.
pub(crate) async fn add_entry(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<String, AddError> {
    let _timer = state.latency.start();

    let body = body.map_err(|rejection| {
        warn!(error = %rejection, "failed to read request body");
        // Oversized bodies keep their 413; any other read failure is a 500.
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AddError::Body { status }
    })?;

    let size = body.len();
    match state.sequencer.sequence(body).await {
        Ok(index) => {
            debug!(index, size, "sequenced entry");
            Ok(format!("{index}\n"))
        }
        Err(e) => {
            warn!(size, error = %e, "failed to sequence entry");
            Err(e.into())
        }
    }
}
