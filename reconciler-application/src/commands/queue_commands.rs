use std::collections::BTreeMap;

use reconciler_domain::{
    AckToken, BatchResponse, FailureReason, MessageQueue, QueueMessage, TicketEvent, TicketKey,
    TrackedEvent,
};
use tracing::warn;

use crate::commands::reconcile_events;
use crate::pipeline::FailureTracker;
use crate::{AppError, AppState};

/// Reconciles a batch delivered from the event queue; message ids are the ack tokens.
pub async fn reconcile_queue_messages(
    state: &AppState,
    messages: Vec<QueueMessage>,
) -> Result<BatchResponse, AppError> {
    if messages.iter().any(|message| message.message_id.is_empty()) {
        return Err(AppError::BadRequest(
            "every queue message needs a messageId".to_string(),
        ));
    }

    let mut tracker = FailureTracker::new();
    let mut by_key: BTreeMap<TicketKey, TrackedEvent> = BTreeMap::new();
    let mut skipped = 0;

    for message in &messages {
        let token = AckToken::from(message.message_id.as_str());
        let event = match TicketEvent::from_json(&message.body) {
            Ok(event) => event,
            Err(err) => {
                warn!(message_id = %message.message_id, error = %err, "unparseable queue message");
                tracker.record(token, FailureReason::ParseError);
                skipped += 1;
                continue;
            }
        };

        let tracked = by_key.entry(event.key()).or_insert_with(|| TrackedEvent {
            event: event.clone(),
            tokens: Vec::new(),
        });
        tracked.event = event;
        tracked.tokens.push(token);
    }

    state.metrics.record_invocation(messages.len(), skipped);
    let events: Vec<TrackedEvent> = by_key.into_values().collect();
    reconcile_events(state, &events, tracker).await
}

/// Deletes `messages` in batches of at most 10. Returns how many the queue confirmed;
/// a failed batch or entry is logged and does not stop the remaining batches.
pub(crate) async fn delete_messages(
    queue: &dyn MessageQueue,
    messages: &[QueueMessage],
    batch_size: usize,
) -> usize {
    let mut deleted = 0;
    for chunk in messages.chunks(batch_size.clamp(1, 10)) {
        let handles: Vec<String> = chunk
            .iter()
            .map(|message| message.receipt_handle.clone())
            .collect();
        match queue.delete_batch(&handles).await {
            Ok(outcome) => {
                deleted += outcome.deleted;
                for failure in outcome.failed {
                    warn!(
                        receipt_handle = %failure.receipt_handle,
                        reason = %failure.reason,
                        "failed to delete queue message"
                    );
                }
            }
            Err(err) => warn!(messages = chunk.len(), error = %err, "queue delete batch failed"),
        }
    }
    deleted
}
