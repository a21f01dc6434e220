use std::collections::{BTreeMap, HashMap};

use reconciler_domain::{
    ticket_from_roster_row, RosterImportRequest, RosterImportResult, RosterRow, Ticket, TicketKey,
};
use tracing::{info, warn};

use crate::pipeline::writer::UpsertPlan;
use crate::{AppError, AppState};

const TICKET_NUMBER_COLUMN: &str = "Ticket Number";

/// Loads a roster CSV from the object store into the ticket table.
///
/// Rows are upserted with the same read-compare-write rule as registrations, so
/// re-importing an unchanged roster writes nothing. `records_imported` counts the
/// rows that were inserted or changed.
pub async fn import_ticket_roster(
    state: &AppState,
    request: RosterImportRequest,
) -> Result<RosterImportResult, AppError> {
    if request.bucket_name.trim().is_empty() || request.object_key.trim().is_empty() {
        return Err(AppError::BadRequest(
            "bucketName and objectKey are required".to_string(),
        ));
    }

    let content = state
        .object_store
        .get_object(&request.bucket_name, &request.object_key)
        .await
        .map_err(|err| AppError::unavailable("object store", err))?;
    let (desired, rows_skipped) = parse_roster(request.event_id, &content)?;

    let keys: Vec<TicketKey> = desired.keys().copied().collect();
    let current: HashMap<TicketKey, Ticket> = state
        .ticket_repo
        .fetch_tickets(&keys)
        .await
        .map_err(|err| AppError::unavailable("ticket store", err))?
        .into_iter()
        .map(|ticket| (ticket.key(), ticket))
        .collect();

    let plan = UpsertPlan::build(&desired, &current);
    let pending = plan.pending();
    let chunks = pending.chunks(state.config.store_batch_write_limit.max(1));
    let chunk_count = chunks.len();
    let mut chunk_errors = 0;
    let mut imported = 0;
    let mut failed = 0;

    for chunk in chunks {
        match state.ticket_repo.write_tickets(chunk).await {
            Ok(outcome) => {
                for ticket in &outcome.unprocessed {
                    warn!(key = %ticket.key(), "ticket write left unprocessed");
                }
                failed += outcome.unprocessed.len();
                imported += chunk.len().saturating_sub(outcome.unprocessed.len());
            }
            Err(err) => {
                warn!(tickets = chunk.len(), error = %err, "ticket batch write failed");
                chunk_errors += 1;
                failed += chunk.len();
            }
        }
    }
    if chunk_count > 0 && chunk_errors == chunk_count {
        return Err(AppError::unavailable(
            "ticket store",
            anyhow::anyhow!("every ticket write batch failed"),
        ));
    }

    state.metrics.record_tickets_imported(imported);
    info!(
        event_id = request.event_id,
        key = %request.object_key,
        rows = desired.len(),
        imported,
        unchanged = plan.unchanged,
        failed,
        skipped = rows_skipped,
        "imported ticket roster"
    );
    Ok(RosterImportResult {
        records_imported: imported,
        records_failed: failed,
        rows_skipped,
    })
}

/// Tickets keyed by `(event, id)`, last row wins, plus the number of rows skipped.
fn parse_roster(
    event_id: i64,
    content: &[u8],
) -> Result<(BTreeMap<TicketKey, Ticket>, usize), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content);
    let has_ticket_numbers = reader
        .headers()
        .map_err(|err| AppError::BadRequest(format!("unreadable roster: {err}")))?
        .iter()
        .any(|header| header == TICKET_NUMBER_COLUMN);
    if !has_ticket_numbers {
        return Err(AppError::BadRequest(format!(
            "roster has no {TICKET_NUMBER_COLUMN:?} column"
        )));
    }

    let mut tickets = BTreeMap::new();
    let mut skipped = 0;
    for (index, row) in reader.deserialize::<RosterRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line, error = %err, "unreadable roster row");
                skipped += 1;
                continue;
            }
        };
        match ticket_from_roster_row(event_id, &row) {
            Ok(ticket) => {
                tickets.insert(ticket.key(), ticket);
            }
            Err(err) => {
                warn!(line, error = %err, "skipping roster row");
                skipped += 1;
            }
        }
    }
    Ok((tickets, skipped))
}
