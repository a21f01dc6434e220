use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use reconciler_application::commands::generate_dlq_report;
use reconciler_application::AppState;
use reconciler_domain::DlqReportResult;

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn trigger_dlq_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DlqReportResult>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let result = generate_dlq_report(&state).await?;
    Ok(Json(result))
}
