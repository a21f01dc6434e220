// Failure reason value object
// Why a single input item has to be redelivered

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    ParseError,
    InvalidName,
    LookupFailure,
    AccountNotFound,
    PersistFailure,
    EnqueueFailure,
}

impl FailureReason {
    pub const ALL: [FailureReason; 6] = [
        FailureReason::ParseError,
        FailureReason::InvalidName,
        FailureReason::LookupFailure,
        FailureReason::AccountNotFound,
        FailureReason::PersistFailure,
        FailureReason::EnqueueFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ParseError => "PARSE_ERROR",
            FailureReason::InvalidName => "INVALID_NAME",
            FailureReason::LookupFailure => "LOOKUP_FAILURE",
            FailureReason::AccountNotFound => "ACCOUNT_NOT_FOUND",
            FailureReason::PersistFailure => "PERSIST_FAILURE",
            FailureReason::EnqueueFailure => "ENQUEUE_FAILURE",
        }
    }
}
