// Dead-letter report entities

use serde::{Deserialize, Serialize};

use crate::value_objects::DlqFailureCode;

/// One row of the dead-letter CSV report. Serde names are the CSV headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlqErrorEntry {
    #[serde(rename = "Event ID")]
    pub event_id: Option<i64>,
    #[serde(rename = "Record ID")]
    pub ticket_id: Option<i64>,
    #[serde(rename = "Ticket ID")]
    pub ticket_number: String,
    #[serde(rename = "Purchaser Name")]
    pub purchaser_name: String,
    #[serde(rename = "Failure Code")]
    pub failure_code: DlqFailureCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlqReportResult {
    pub entries_reported: usize,
    pub bucket_name: String,
    pub object_key: String,
}
