use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::entities::{AttributeValue, ChangeRecord, ChangeType, TicketEvent, TrackedEvent};
use crate::value_objects::{AckToken, TicketKey};

pub const EVENT_ID_FIELD: &str = "event_id";
pub const ID_FIELD: &str = "id";
pub const PURCHASER_NAME_FIELD: &str = "purchaser_name";
pub const TICKET_NUMBER_FIELD: &str = "ticket_id";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record is missing its after image")]
    MissingAfterImage,
    #[error("field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' is not an integer: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Deduplicated by `(event_id, ticket_id)`, ordered by key.
    pub events: Vec<TrackedEvent>,
    /// Records dropped as malformed (missing after image or bad identifiers).
    pub skipped: usize,
}

impl NormalizedBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub fn normalize_change_records(records: &[ChangeRecord]) -> NormalizedBatch {
    let mut by_key: BTreeMap<TicketKey, TrackedEvent> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        match record.change_type {
            ChangeType::Remove => continue,
            ChangeType::Unknown => {
                warn!(
                    sequence_token = %record.sequence_token,
                    "skipping change record with unknown change type"
                );
                continue;
            }
            ChangeType::Insert | ChangeType::Modify => {}
        }

        let event = match to_ticket_event(record) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(
                    sequence_token = %record.sequence_token,
                    "no purchaser name yet, nothing to reconcile"
                );
                continue;
            }
            Err(err) => {
                warn!(
                    sequence_token = %record.sequence_token,
                    error = %err,
                    "skipping malformed change record"
                );
                skipped += 1;
                continue;
            }
        };

        let token = AckToken::from(record.sequence_token.as_str());
        match by_key.get_mut(&event.key()) {
            Some(existing) => {
                existing.event = event;
                existing.tokens.push(token);
            }
            None => {
                by_key.insert(
                    event.key(),
                    TrackedEvent {
                        event,
                        tokens: vec![token],
                    },
                );
            }
        }
    }

    NormalizedBatch {
        events: by_key.into_values().collect(),
        skipped,
    }
}

/// `Ok(None)` means the record is valid but carries no purchaser name.
fn to_ticket_event(record: &ChangeRecord) -> Result<Option<TicketEvent>, NormalizeError> {
    let image = record
        .after_image
        .as_ref()
        .ok_or(NormalizeError::MissingAfterImage)?;

    let purchaser_name = match image.get(PURCHASER_NAME_FIELD).and_then(AttributeValue::as_text) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Ok(None),
    };
    let event_id = required_number(image, EVENT_ID_FIELD)?;
    let ticket_id = required_number(image, ID_FIELD)?;
    let ticket_number = image
        .get(TICKET_NUMBER_FIELD)
        .and_then(AttributeValue::as_text)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    Ok(Some(TicketEvent {
        event_id,
        ticket_id,
        purchaser_name,
        ticket_number,
    }))
}

fn required_number(
    image: &HashMap<String, AttributeValue>,
    field: &'static str,
) -> Result<i64, NormalizeError> {
    let raw = image
        .get(field)
        .and_then(AttributeValue::as_text)
        .ok_or(NormalizeError::MissingField(field))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| NormalizeError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
