use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;

use reconciler_application::commands::import_ticket_roster;
use reconciler_application::AppState;
use reconciler_domain::{RosterImportRequest, RosterImportResult};

use crate::error::HttpError;
use crate::middleware::{authorize, parse_body};

pub async fn import_roster(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<RosterImportResult>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let request: RosterImportRequest = parse_body(&headers, &body).map_err(|err| {
        error!("failed to parse roster import request: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    let result = import_ticket_roster(&state, request).await?;
    Ok(Json(result))
}
