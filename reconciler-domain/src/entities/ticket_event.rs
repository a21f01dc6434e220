// Ticket event entity
// One purchaser registration to reconcile, as produced by the change feed

use serde::{Deserialize, Serialize};

use crate::value_objects::{normalize_login, AckToken, TicketKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEvent {
    pub event_id: i64,
    pub ticket_id: i64,
    #[serde(default)]
    pub purchaser_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_number: Option<String>,
}

impl TicketEvent {
    pub fn key(&self) -> TicketKey {
        TicketKey::new(self.event_id, self.ticket_id)
    }

    pub fn login(&self) -> String {
        normalize_login(&self.purchaser_name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

/// A deduplicated event together with every transport token that delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEvent {
    pub event: TicketEvent,
    pub tokens: Vec<AckToken>,
}
