use crate::entities::{DlqErrorEntry, TicketEvent};
use crate::value_objects::{is_valid_login, DlqFailureCode};

/// Decides why a dead-lettered event could not be reconciled.
///
/// An empty ticket number wins over a bad name; a well-formed name that still
/// landed in the backlog means the identity lookup itself kept failing.
pub fn classify_dead_letter(ticket_number: &str, purchaser_name: &str) -> DlqFailureCode {
    if ticket_number.is_empty() {
        DlqFailureCode::MissingPurchaserName
    } else if !is_valid_login(purchaser_name) {
        DlqFailureCode::InvalidName
    } else {
        DlqFailureCode::TwitchApiError
    }
}

pub fn dead_letter_entry(event: &TicketEvent, ticket_number: String) -> DlqErrorEntry {
    let failure_code = classify_dead_letter(&ticket_number, &event.purchaser_name);
    DlqErrorEntry {
        event_id: Some(event.event_id),
        ticket_id: Some(event.ticket_id),
        ticket_number,
        purchaser_name: event.purchaser_name.clone(),
        failure_code,
    }
}

/// Row for a backlog payload that could not be decoded at all.
pub fn unparseable_entry() -> DlqErrorEntry {
    DlqErrorEntry {
        event_id: None,
        ticket_id: None,
        ticket_number: String::new(),
        purchaser_name: String::new(),
        failure_code: DlqFailureCode::ParseError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ticket_number_is_missing_purchaser_name() {
        assert_eq!(
            classify_dead_letter("", "validuser"),
            DlqFailureCode::MissingPurchaserName
        );
        assert_eq!(
            classify_dead_letter("", "bad name!"),
            DlqFailureCode::MissingPurchaserName
        );
    }

    #[test]
    fn bad_characters_are_invalid_name() {
        assert_eq!(
            classify_dead_letter("T-100", "bad name!"),
            DlqFailureCode::InvalidName
        );
    }

    #[test]
    fn valid_name_falls_back_to_api_error() {
        assert_eq!(
            classify_dead_letter("T-100", "validuser"),
            DlqFailureCode::TwitchApiError
        );
    }

    #[test]
    fn entry_carries_event_identity() {
        let event = TicketEvent {
            event_id: 488,
            ticket_id: 62005,
            purchaser_name: "Kenley".to_string(),
            ticket_number: None,
        };
        let entry = dead_letter_entry(&event, "T-62005".to_string());
        assert_eq!(entry.event_id, Some(488));
        assert_eq!(entry.ticket_id, Some(62005));
        assert_eq!(entry.failure_code, DlqFailureCode::TwitchApiError);
    }
}
