use axum::routing::{get, post};
use axum::Router;

use reconciler_application::AppState;

use crate::handlers::{
    dlq_handlers, import_handlers, ops_handlers, queue_handlers, stream_handlers,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/stream/reconcile",
            post(stream_handlers::reconcile_stream),
        )
        .route("/v1/stream/forward", post(stream_handlers::forward_stream))
        .route("/v1/queue/reconcile", post(queue_handlers::reconcile_queue))
        .route("/v1/queue/consume", post(queue_handlers::consume_queue))
        .route("/v1/tickets/import", post(import_handlers::import_roster))
        .route("/v1/dlq/report", post(dlq_handlers::trigger_dlq_report))
        .route("/v1/ops/health/live", get(ops_handlers::health_live))
        .route("/v1/ops/health/ready", get(ops_handlers::health_ready))
        .route(
            "/v1/ops/metrics/prometheus",
            get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
