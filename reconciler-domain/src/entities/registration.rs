// Registration link entity
// Durable fact: this ticket of this event belongs to this external account

use serde::{Deserialize, Serialize};

use crate::value_objects::TicketKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationLink {
    pub event_id: i64,
    pub ticket_id: i64,
    pub external_account_id: i64,
}

impl RegistrationLink {
    pub fn key(&self) -> TicketKey {
        TicketKey::new(self.event_id, self.ticket_id)
    }
}
