use std::future::Future;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use tokio::time::{timeout, Duration};
use tracing::error;

use reconciler_application::AppState;

use crate::middleware::authorize;

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> StatusCode {
    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let limit = Duration::from_secs(timeout_secs);
    let database = timed_check("database", limit, state.health_service.check_database()).await;
    let queues = timed_check("queues", limit, state.health_service.check_queues()).await;
    if database && queues {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn timed_check<F>(name: &str, limit: Duration, check: F) -> bool
where
    F: Future<Output = anyhow::Result<bool>>,
{
    match timeout(limit, check).await {
        Ok(Ok(ready)) => ready,
        Ok(Err(err)) => {
            error!("{} ready check failed: {}", name, err);
            false
        }
        Err(_) => {
            error!("{} ready check timeout after {}s", name, limit.as_secs());
            false
        }
    }
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    }
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}
