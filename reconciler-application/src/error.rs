use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A whole dependency could not be reached; the invocation is failed as a unit.
    #[error("{dependency} unavailable: {source}")]
    Unavailable {
        dependency: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unavailable(dependency: &'static str, source: anyhow::Error) -> Self {
        AppError::Unavailable { dependency, source }
    }
}
