use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use reconciler_domain::{
    current_millis, dead_letter_entry, unparseable_entry, DlqErrorEntry, DlqReportResult,
    QueueMessage, TicketEvent,
};
use tracing::{info, warn};

use crate::commands::queue_commands::delete_messages;
use crate::{AppError, AppState};

pub const REPORT_HEADER: [&str; 5] = [
    "Event ID",
    "Record ID",
    "Ticket ID",
    "Purchaser Name",
    "Failure Code",
];

/// Drains the backlog queue, uploads a CSV of why each item failed, then purges
/// the drained messages. Every call is a complete cycle.
pub async fn generate_dlq_report(state: &AppState) -> Result<DlqReportResult, AppError> {
    let result = run_report_cycle(state).await;
    if result.is_err() {
        state.metrics.record_invocation_error();
    }
    result
}

async fn run_report_cycle(state: &AppState) -> Result<DlqReportResult, AppError> {
    let drained = drain_backlog(state).await?;
    let entries = classify_messages(state, &drained).await?;

    let csv = render_report_csv(&entries)?;
    let bucket = state.config.report_bucket.clone();
    let object_key = format!(
        "{}/{}.csv",
        state.config.report_key_prefix.trim_end_matches('/'),
        current_millis()
    );
    upload_report(state, &bucket, &object_key, &csv).await?;
    info!(
        entries = entries.len(),
        bucket = %bucket,
        key = %object_key,
        "uploaded dead-letter report"
    );

    let purged = delete_messages(
        state.backlog_queue.as_ref(),
        &drained,
        state.config.queue_batch_size,
    )
    .await;
    state.metrics.record_dlq_report(entries.len(), purged);

    let result = DlqReportResult {
        entries_reported: entries.len(),
        bucket_name: bucket,
        object_key,
    };
    if let Err(err) = state.report_notifier.notify_report(&result).await {
        warn!(error = %err, "failed to send report notification");
    }
    Ok(result)
}

async fn drain_backlog(state: &AppState) -> Result<Vec<QueueMessage>, AppError> {
    let batch_size = state.config.queue_batch_size.clamp(1, 10);
    let visibility = Duration::from_secs(state.config.visibility_timeout_seconds);
    let mut seen = HashSet::new();
    let mut drained = Vec::new();

    loop {
        let batch = state
            .backlog_queue
            .receive(batch_size, visibility)
            .await
            .map_err(|err| AppError::unavailable("backlog queue", err))?;
        if batch.is_empty() {
            break;
        }

        let mut fresh = 0;
        for message in batch {
            if seen.insert(message.message_id.clone()) {
                drained.push(message);
                fresh += 1;
            }
        }
        // Redelivered messages only: the visibility window ran out mid-drain.
        if fresh == 0 {
            warn!(drained = drained.len(), "backlog returned only seen messages, stopping drain");
            break;
        }
    }

    Ok(drained)
}

async fn classify_messages(
    state: &AppState,
    messages: &[QueueMessage],
) -> Result<Vec<DlqErrorEntry>, AppError> {
    let mut entries = Vec::with_capacity(messages.len());
    for message in messages {
        let event = match TicketEvent::from_json(&message.body) {
            Ok(event) => event,
            Err(err) => {
                warn!(message_id = %message.message_id, error = %err, "unparseable backlog message");
                entries.push(unparseable_entry());
                continue;
            }
        };

        let ticket_number = match event.ticket_number.as_deref() {
            Some(number) if !number.is_empty() => number.to_string(),
            _ => state
                .ticket_repo
                .get_ticket(event.key())
                .await
                .map_err(|err| AppError::unavailable("ticket store", err))?
                .map(|ticket| ticket.ticket_number)
                .unwrap_or_default(),
        };
        entries.push(dead_letter_entry(&event, ticket_number));
    }

    entries.sort_by_key(|entry| (entry.event_id, entry.ticket_id));
    Ok(entries)
}

pub fn render_report_csv(entries: &[DlqErrorEntry]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(REPORT_HEADER)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush report: {}", err.error()))
}

async fn upload_report(
    state: &AppState,
    bucket: &str,
    key: &str,
    csv: &[u8],
) -> Result<(), AppError> {
    let file = tempfile::Builder::new()
        .prefix("dlq-report-")
        .suffix(".csv")
        .tempfile()
        .context("failed to create report file")?;
    tokio::fs::write(file.path(), csv)
        .await
        .context("failed to write report file")?;

    state
        .object_store
        .put_object(bucket, key, file.path())
        .await
        .map_err(|err| AppError::unavailable("object store", err))
}

#[cfg(test)]
mod tests {
    use reconciler_domain::DlqFailureCode;

    use super::*;
    use crate::testing::{ticket, FakeDirectory, Harness, InMemoryQueue};

    fn body(event_id: i64, ticket_id: i64, name: &str, number: Option<&str>) -> String {
        TicketEvent {
            event_id,
            ticket_id,
            purchaser_name: name.to_string(),
            ticket_number: number.map(str::to_string),
        }
        .to_json()
        .unwrap()
    }

    #[tokio::test]
    async fn drains_reports_and_purges_fifteen_messages() {
        let bodies = (1..=15)
            .map(|i| body(1, i, &format!("user{i}"), Some("T-1")))
            .collect();
        let harness =
            Harness::new(FakeDirectory::default()).with_backlog(InMemoryQueue::with_bodies(bodies));
        let state = harness.state();

        let result = generate_dlq_report(&state).await.unwrap();

        assert_eq!(result.entries_reported, 15);
        assert_eq!(result.bucket_name, "ticket-reconciler-reports");
        assert!(result.object_key.starts_with("error-reports/"));
        assert!(result.object_key.ends_with(".csv"));
        assert_eq!(harness.backlog.receive_sizes(), vec![10, 5, 0]);
        assert_eq!(harness.backlog.delete_sizes(), vec![10, 5]);
        assert_eq!(harness.backlog.deleted(), 15);
        assert_eq!(harness.backlog.remaining(), 0);

        let objects = harness.objects.objects();
        let csv = objects
            .get(&(result.bucket_name.clone(), result.object_key.clone()))
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Event ID,Record ID,Ticket ID,Purchaser Name,Failure Code");
        assert_eq!(lines.len(), 16);
        assert_eq!(harness.notifier.notified(), vec![result]);
    }

    #[tokio::test]
    async fn failed_delete_does_not_block_later_purge_batches() {
        let bodies = (1..=15)
            .map(|i| body(1, i, &format!("user{i}"), Some("T-1")))
            .collect();
        let harness =
            Harness::new(FakeDirectory::default()).with_backlog(InMemoryQueue::with_bodies(bodies));
        harness.backlog.fail_deletes_of("m3");
        let state = harness.state();

        let result = generate_dlq_report(&state).await.unwrap();

        assert_eq!(result.entries_reported, 15);
        assert_eq!(harness.backlog.delete_sizes(), vec![10, 5]);
        assert_eq!(harness.backlog.deleted(), 14);
        assert_eq!(harness.backlog.remaining(), 1);
        assert_eq!(harness.notifier.notified().len(), 1);
    }

    #[tokio::test]
    async fn classifies_each_failure_kind() {
        let bodies = vec![
            body(2, 1, "valid_user", Some("T-9")),
            body(1, 2, "bad name!", Some("T-8")),
            body(1, 1, "someone", None),
            "garbage".to_string(),
            body(3, 3, "from_table", None),
        ];
        let harness =
            Harness::new(FakeDirectory::default()).with_backlog(InMemoryQueue::with_bodies(bodies));
        harness.store.seed_ticket(ticket(3, 3, "T-3", "from_table"));
        let state = harness.state();

        let result = generate_dlq_report(&state).await.unwrap();
        let csv = harness
            .objects
            .objects()
            .remove(&(result.bucket_name, result.object_key))
            .unwrap();
        let rows: Vec<&str> = csv.lines().skip(1).collect();

        assert_eq!(
            rows,
            vec![
                ",,,,PARSE_ERROR",
                "1,1,,someone,MISSING_PURCHASER_NAME",
                "1,2,T-8,bad name!,INVALID_NAME",
                "2,1,T-9,valid_user,TWITCH_API_ERROR",
                "3,3,T-3,from_table,TWITCH_API_ERROR",
            ]
        );
        assert_eq!(harness.backlog.deleted(), 5);
    }

    #[tokio::test]
    async fn empty_backlog_still_uploads_a_header() {
        let harness = Harness::new(FakeDirectory::default());
        let state = harness.state();

        let result = generate_dlq_report(&state).await.unwrap();

        assert_eq!(result.entries_reported, 0);
        let objects = harness.objects.objects();
        let csv = objects.values().next().unwrap();
        assert_eq!(csv.trim_end(), REPORT_HEADER.join(","));
    }

    #[tokio::test]
    async fn failed_upload_leaves_the_backlog_untouched() {
        let bodies = vec![body(1, 1, "someone", Some("T-1"))];
        let harness =
            Harness::new(FakeDirectory::default()).with_backlog(InMemoryQueue::with_bodies(bodies));
        harness.objects.fail_puts();
        let state = harness.state();

        let result = generate_dlq_report(&state).await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
        assert_eq!(harness.backlog.deleted(), 0);
        assert_eq!(harness.backlog.remaining(), 1);
        assert!(harness.notifier.notified().is_empty());
    }

    #[tokio::test]
    async fn ticket_store_error_aborts_before_reporting() {
        let bodies = vec![body(1, 1, "someone", None)];
        let harness =
            Harness::new(FakeDirectory::default()).with_backlog(InMemoryQueue::with_bodies(bodies));
        harness.store.fail_ticket_reads();
        let state = harness.state();

        assert!(generate_dlq_report(&state).await.is_err());
        assert!(harness.objects.objects().is_empty());
        assert_eq!(harness.backlog.deleted(), 0);
    }

    #[test]
    fn failure_code_column_uses_report_names() {
        let csv = render_report_csv(&[unparseable_entry()]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.ends_with(&format!("{}\n", DlqFailureCode::ParseError.as_str())));
    }
}
