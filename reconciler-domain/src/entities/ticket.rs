// Ticket entity and roster import DTOs

use serde::{Deserialize, Serialize};

use crate::value_objects::TicketKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub event_id: i64,
    pub id: i64,
    pub ticket_number: String,
    pub purchaser_name: String,
    pub order_number: String,
    pub ticket_type: String,
    pub access_code: String,
    pub price_cents: i64,
}

impl Ticket {
    pub fn key(&self) -> TicketKey {
        TicketKey::new(self.event_id, self.id)
    }
}

/// One row of an exported ticket roster. Serde names are the CSV headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RosterRow {
    #[serde(rename = "Ticket Number")]
    pub ticket_number: String,
    #[serde(rename = "Order Number", default)]
    pub order_number: String,
    #[serde(rename = "Purchaser Name", default)]
    pub purchaser_name: String,
    #[serde(rename = "Ticket Type", default)]
    pub ticket_type: String,
    #[serde(rename = "Price", default)]
    pub price: String,
    #[serde(rename = "Access Code", default)]
    pub access_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterImportRequest {
    pub bucket_name: String,
    pub object_key: String,
    pub event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterImportResult {
    pub records_imported: usize,
    pub records_failed: usize,
    pub rows_skipped: usize,
}
