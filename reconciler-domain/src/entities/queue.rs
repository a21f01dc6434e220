// Queue message entities

use serde::{Deserialize, Serialize};

/// A message handed out by a queue receive, or delivered by the queue trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub message_id: String,
    #[serde(default)]
    pub receipt_handle: String,
    pub body: String,
    /// Deliveries so far, this one included.
    #[serde(default)]
    pub receive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Ids of the outbound entries the queue did not accept.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub receipt_handle: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub failed: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueBatch {
    #[serde(default)]
    pub messages: Vec<QueueMessage>,
}
