use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use reconciler_application::commands::{forward_change_records, reconcile_change_records};
use reconciler_application::AppState;
use reconciler_domain::{BatchResponse, ChangeFeedBatch};

use crate::error::HttpError;
use crate::middleware::{authorize, parse_body};

fn parse_batch(headers: &HeaderMap, body: &[u8]) -> Result<ChangeFeedBatch, HttpError> {
    parse_body(headers, body).map_err(|err| {
        error!("failed to parse change feed batch: {}", err);
        HttpError::BadRequest(err.to_string())
    })
}

pub async fn reconcile_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<BatchResponse>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let batch = parse_batch(&headers, &body)?;
    let response = reconcile_change_records(&state, batch.records).await?;
    Ok(Json(response))
}

pub async fn forward_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<BatchResponse>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let batch = parse_batch(&headers, &body)?;
    let response = forward_change_records(&state, batch.records).await?;
    Ok(Json(response))
}
