use thiserror::Error;

use crate::entities::{RosterRow, Ticket};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("ticket number {0:?} has no numeric part")]
    TicketNumber(String),
    #[error("price {0:?} is not a decimal amount")]
    Price(String),
}

/// Builds the ticket row for one roster line of `event_id`.
pub fn ticket_from_roster_row(event_id: i64, row: &RosterRow) -> Result<Ticket, RosterError> {
    let ticket_number = row.ticket_number.trim();
    let id = ticket_id_from_number(ticket_number)
        .ok_or_else(|| RosterError::TicketNumber(row.ticket_number.clone()))?;
    let price_cents =
        parse_price_cents(&row.price).ok_or_else(|| RosterError::Price(row.price.clone()))?;

    Ok(Ticket {
        event_id,
        id,
        ticket_number: ticket_number.to_string(),
        purchaser_name: row.purchaser_name.trim().to_string(),
        order_number: row.order_number.trim().to_string(),
        ticket_type: row.ticket_type.trim().to_string(),
        access_code: row.access_code.trim().to_string(),
        price_cents,
    })
}

/// Numeric ticket id from the trailing digits of a ticket number (`"SOBA-00123"` is 123).
pub fn ticket_id_from_number(ticket_number: &str) -> Option<i64> {
    let prefix = ticket_number.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &ticket_number[prefix.len()..];
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Empty prices are free tickets.
fn parse_price_cents(price: &str) -> Option<i64> {
    let cleaned: String = price
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    let (whole, fraction) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    if whole < 0 {
        return None;
    }
    let cents: i64 = format!("{fraction:0<2}").parse().ok()?;
    whole.checked_mul(100)?.checked_add(cents)
}
