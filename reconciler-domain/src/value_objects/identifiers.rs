// Identifier value objects

use std::fmt;

use serde::{Deserialize, Serialize};

/// Natural key of a ticket within an event: `(event_id, ticket_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketKey {
    pub event_id: i64,
    pub ticket_id: i64,
}

impl TicketKey {
    pub fn new(event_id: i64, ticket_id: i64) -> Self {
        Self {
            event_id,
            ticket_id,
        }
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.ticket_id)
    }
}

/// Transport-level acknowledgment token of one input item
/// (stream sequence number or queue message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AckToken(pub String);

impl AckToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AckToken {
    fn from(value: &str) -> Self {
        AckToken(value.to_string())
    }
}

impl From<String> for AckToken {
    fn from(value: String) -> Self {
        AckToken(value)
    }
}

impl fmt::Display for AckToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
