use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use reconciler_application::AppError;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::BadRequest(msg) => HttpError::BadRequest(msg),
            other @ (AppError::Unavailable { .. } | AppError::Internal(_)) => {
                error!("invocation failed: {:#}", anyhow::Error::from(other));
                HttpError::Internal("invocation failed, retry the batch".to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systemic_failures_map_to_server_errors() {
        let err = HttpError::from(AppError::unavailable(
            "account store",
            anyhow::anyhow!("connection refused"),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = HttpError::from(AppError::BadRequest("missing id".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
