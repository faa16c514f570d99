//! `POST /ask`: stream the answer to one question as NDJSON.
//!
//! Body: `{"question": "...", "responseMode": "component" | "html",
//! "conversation_id": "..."}`. Each line of the response is one
//! [`StreamEvent`](cypherchat_agent::StreamEvent).

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use cypherchat_agent::AskRequest;
use cypherchat_core::error::Error;

use crate::SharedState;

pub const NDJSON: &str = "application/x-ndjson";

/// Error body, shaped `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

pub async fn ask_handler(
    State(state): State<SharedState>,
    Json(request): Json<AskRequest>,
) -> Result<Response, (StatusCode, Json<ErrorDetail>)> {
    let rx = state.coordinator.ask(request).await.map_err(|e| {
        let status = match e {
            Error::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = %status, error = %e, "Rejected question");
        let detail = match e {
            Error::InvalidRequest(message) => message,
            other => other.to_string(),
        };
        (status, Json(ErrorDetail { detail }))
    })?;

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.encode()));
    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(stream)).into_response())
}
