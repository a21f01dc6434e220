use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use reconciler_application::commands::{
    consume_event_queue, reconcile_queue_messages, ConsumeReport,
};
use reconciler_application::AppState;
use reconciler_domain::{BatchResponse, QueueBatch};

use crate::error::HttpError;
use crate::middleware::{authorize, parse_body};

pub async fn reconcile_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<BatchResponse>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let batch: QueueBatch = parse_body(&headers, &body).map_err(|err| {
        error!("failed to parse queue batch: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    let response = reconcile_queue_messages(&state, batch.messages).await?;
    Ok(Json(response))
}

/// Runs one consume cycle against the event queue.
pub async fn consume_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConsumeReport>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let report = consume_event_queue(&state).await?;
    Ok(Json(report))
}
