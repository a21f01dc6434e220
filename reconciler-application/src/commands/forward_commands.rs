use std::collections::HashMap;

use reconciler_domain::{
    normalize_change_records, AckToken, BatchResponse, ChangeRecord, FailureReason,
    OutboundMessage,
};
use tracing::{info, warn};

use crate::commands::reconcile_commands::finish;
use crate::pipeline::FailureTracker;
use crate::{AppError, AppState};

/// Normalizes change records and hands each event to the event queue for
/// asynchronous reconciliation.
pub async fn forward_change_records(
    state: &AppState,
    records: Vec<ChangeRecord>,
) -> Result<BatchResponse, AppError> {
    let batch = normalize_change_records(&records);
    state.metrics.record_invocation(records.len(), batch.skipped);

    let mut tracker = FailureTracker::new();
    let mut enqueued = 0;

    for chunk in batch.events.chunks(state.config.queue_batch_size.max(1)) {
        let mut messages = Vec::with_capacity(chunk.len());
        let mut tokens_by_id: HashMap<String, &[AckToken]> = HashMap::new();

        for tracked in chunk {
            let event = &tracked.event;
            match event.to_json() {
                Ok(body) => {
                    let id = format!("{}-{}", event.event_id, event.ticket_id);
                    tokens_by_id.insert(id.clone(), &tracked.tokens);
                    messages.push(OutboundMessage { id, body });
                }
                Err(err) => {
                    warn!(key = %event.key(), error = %err, "failed to serialize event");
                    tracker.record_all(&tracked.tokens, FailureReason::EnqueueFailure);
                }
            }
        }
        if messages.is_empty() {
            continue;
        }

        match state.event_queue.send_batch(&messages).await {
            Ok(outcome) => {
                let mut rejected = 0;
                for id in &outcome.failed {
                    warn!(entry = %id, "event queue rejected entry");
                    if let Some(tokens) = tokens_by_id.get(id) {
                        tracker.record_all(tokens.iter(), FailureReason::EnqueueFailure);
                        rejected += 1;
                    }
                }
                enqueued += messages.len().saturating_sub(rejected);
            }
            Err(err) => {
                warn!(entries = messages.len(), error = %err, "event queue send failed");
                for tokens in tokens_by_id.values() {
                    tracker.record_all(tokens.iter(), FailureReason::EnqueueFailure);
                }
            }
        }
    }

    state.metrics.record_enqueued(enqueued);
    info!(
        events = batch.events.len(),
        enqueued,
        failures = tracker.len(),
        "forwarded batch"
    );
    Ok(finish(state, tracker))
}
