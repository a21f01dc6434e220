// Per-item failure records and the transport-facing retry response

use serde::{Deserialize, Serialize};

use crate::value_objects::{AckToken, FailureReason};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub input_item_id: AckToken,
    pub reason_code: FailureReason,
}

/// "Retry exactly this subset": an empty list means the whole batch succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub failed_items: Vec<AckToken>,
}

impl BatchResponse {
    pub fn is_success(&self) -> bool {
        self.failed_items.is_empty()
    }
}
