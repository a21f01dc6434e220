use std::collections::HashSet;
use std::time::Duration;

use reconciler_domain::{AckToken, OutboundMessage, QueueMessage};
use serde::Serialize;
use tracing::{info, warn};

use crate::commands::queue_commands::{delete_messages, reconcile_queue_messages};
use crate::{AppError, AppState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeReport {
    pub received: usize,
    pub acknowledged: usize,
    pub redriven: usize,
    pub retrying: usize,
}

/// Receives one batch from the event queue and reconciles it.
///
/// Messages that reconciled are deleted. Failed messages are left to reappear once
/// their visibility timeout ends; a failed message already delivered
/// `max_receive_count` times is moved to the backlog queue instead.
pub async fn consume_event_queue(state: &AppState) -> Result<ConsumeReport, AppError> {
    let batch_size = state.config.queue_batch_size.clamp(1, 10);
    let visibility = Duration::from_secs(state.config.visibility_timeout_seconds);
    let messages = state
        .event_queue
        .receive(batch_size, visibility)
        .await
        .map_err(|err| AppError::unavailable("event queue", err))?;
    if messages.is_empty() {
        return Ok(ConsumeReport::default());
    }
    let received = messages.len();

    let response = reconcile_queue_messages(state, messages.clone()).await?;
    let failed: HashSet<&str> = response.failed_items.iter().map(AckToken::as_str).collect();
    let (retry, done): (Vec<QueueMessage>, Vec<QueueMessage>) = messages
        .into_iter()
        .partition(|message| failed.contains(message.message_id.as_str()));

    let acknowledged = delete_messages(state.event_queue.as_ref(), &done, batch_size).await;
    let (exhausted, retrying): (Vec<QueueMessage>, Vec<QueueMessage>) = retry
        .into_iter()
        .partition(|message| message.receive_count >= state.config.max_receive_count);
    let redriven = redrive(state, &exhausted, batch_size).await;

    state.metrics.record_consumed(acknowledged, redriven);
    let report = ConsumeReport {
        received,
        acknowledged,
        redriven,
        retrying: retrying.len(),
    };
    info!(
        received,
        acknowledged,
        redriven,
        retrying = report.retrying,
        "consumed event queue batch"
    );
    Ok(report)
}

/// Copies `messages` to the backlog and deletes the copied ones from the event queue.
async fn redrive(state: &AppState, messages: &[QueueMessage], batch_size: usize) -> usize {
    let mut moved = Vec::with_capacity(messages.len());
    for chunk in messages.chunks(batch_size) {
        let outbound: Vec<OutboundMessage> = chunk
            .iter()
            .map(|message| OutboundMessage {
                id: message.message_id.clone(),
                body: message.body.clone(),
            })
            .collect();
        match state.backlog_queue.send_batch(&outbound).await {
            Ok(outcome) => {
                let rejected: HashSet<&str> = outcome.failed.iter().map(String::as_str).collect();
                for message in chunk {
                    if rejected.contains(message.message_id.as_str()) {
                        warn!(message_id = %message.message_id, "backlog rejected message");
                    } else {
                        moved.push(message.clone());
                    }
                }
            }
            Err(err) => warn!(messages = chunk.len(), error = %err, "backlog send failed"),
        }
    }

    for message in &moved {
        warn!(
            message_id = %message.message_id,
            receive_count = message.receive_count,
            "moved message to backlog"
        );
    }
    delete_messages(state.event_queue.as_ref(), &moved, batch_size).await;
    moved.len()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use reconciler_domain::{AttributeValue, ChangeRecord, ChangeType, TicketEvent};

    use super::*;
    use crate::commands::{forward_change_records, generate_dlq_report};
    use crate::testing::{FakeDirectory, Harness, InMemoryQueue};

    fn purchase(token: &str, event_id: i64, ticket_id: i64, name: &str) -> ChangeRecord {
        let image = HashMap::from([
            ("event_id".to_string(), AttributeValue::N(event_id.to_string())),
            ("id".to_string(), AttributeValue::N(ticket_id.to_string())),
            ("purchaser_name".to_string(), AttributeValue::S(name.to_string())),
            (
                "ticket_id".to_string(),
                AttributeValue::S(format!("SOBA-{ticket_id}")),
            ),
        ]);
        ChangeRecord {
            change_type: ChangeType::Insert,
            sequence_token: token.to_string(),
            after_image: Some(image),
        }
    }

    fn body(ticket_id: i64, name: &str) -> String {
        TicketEvent {
            event_id: 488,
            ticket_id,
            purchaser_name: name.to_string(),
            ticket_number: Some(format!("SOBA-{ticket_id}")),
        }
        .to_json()
        .unwrap()
    }

    #[tokio::test]
    async fn unresolvable_forwarded_event_ends_up_in_the_report() {
        let harness = Harness::new(FakeDirectory::default());
        let mut state = harness.state();
        state.config.max_receive_count = 2;

        let forwarded =
            forward_change_records(&state, vec![purchase("100", 488, 62005, "ghost_user")])
                .await
                .unwrap();
        assert!(forwarded.is_success());

        let first = consume_event_queue(&state).await.unwrap();
        assert_eq!(
            first,
            ConsumeReport {
                received: 1,
                acknowledged: 0,
                redriven: 0,
                retrying: 1,
            }
        );
        assert!(harness.store.links().is_empty());

        harness.events.expire_leases();
        let second = consume_event_queue(&state).await.unwrap();
        assert_eq!(second.redriven, 1);
        assert_eq!(harness.events.remaining(), 0);
        assert_eq!(harness.backlog.remaining(), 1);

        let report = generate_dlq_report(&state).await.unwrap();
        assert_eq!(report.entries_reported, 1);
        let csv = harness
            .objects
            .objects()
            .remove(&(report.bucket_name, report.object_key))
            .unwrap();
        assert_eq!(
            csv.lines().nth(1),
            Some("488,62005,SOBA-62005,ghost_user,TWITCH_API_ERROR")
        );
        assert_eq!(harness.backlog.remaining(), 0);
    }

    #[tokio::test]
    async fn reconciled_messages_are_deleted_and_failures_wait() {
        let harness = Harness::new(FakeDirectory::with_users(&[("kenley", 70376773)]))
            .with_events(InMemoryQueue::with_bodies(vec![
                body(1, "Kenley"),
                body(2, "stranger"),
            ]));
        let state = harness.state();

        let report = consume_event_queue(&state).await.unwrap();

        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.retrying, 1);
        assert_eq!(harness.events.deleted(), 1);
        assert_eq!(harness.events.remaining(), 1);
        assert_eq!(harness.store.links().len(), 1);
        assert_eq!(harness.backlog.remaining(), 0);
    }

    #[tokio::test]
    async fn unparseable_message_is_redriven_with_its_raw_body() {
        let harness = Harness::new(FakeDirectory::default())
            .with_events(InMemoryQueue::with_bodies(vec!["garbage".to_string()]));
        let mut state = harness.state();
        state.config.max_receive_count = 1;

        let report = consume_event_queue(&state).await.unwrap();

        assert_eq!(report.redriven, 1);
        assert_eq!(harness.backlog.bodies(), vec!["garbage".to_string()]);
        assert_eq!(harness.events.remaining(), 0);
    }

    #[tokio::test]
    async fn message_stays_queued_when_backlog_rejects_it() {
        let harness = Harness::new(FakeDirectory::default())
            .with_events(InMemoryQueue::with_bodies(vec![body(1, "ghost")]));
        harness.backlog.fail_sends();
        let mut state = harness.state();
        state.config.max_receive_count = 1;

        let report = consume_event_queue(&state).await.unwrap();

        assert_eq!(report.redriven, 0);
        assert_eq!(harness.events.deleted(), 0);
        assert_eq!(harness.events.remaining(), 1);
    }

    #[tokio::test]
    async fn empty_queue_is_a_quiet_no_op() {
        let harness = Harness::new(FakeDirectory::default());
        let state = harness.state();

        let report = consume_event_queue(&state).await.unwrap();

        assert_eq!(report, ConsumeReport::default());
        assert!(harness.directory.calls().is_empty());
    }
}
