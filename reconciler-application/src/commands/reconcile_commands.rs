use std::collections::BTreeSet;

use reconciler_domain::{normalize_change_records, BatchResponse, ChangeRecord, TrackedEvent};
use tracing::{debug, info};

use crate::pipeline::{FailureTracker, IdentityResolver, ReconciliationWriter};
use crate::{AppError, AppState};

pub async fn reconcile_change_records(
    state: &AppState,
    records: Vec<ChangeRecord>,
) -> Result<BatchResponse, AppError> {
    let batch = normalize_change_records(&records);
    state.metrics.record_invocation(records.len(), batch.skipped);
    reconcile_events(state, &batch.events, FailureTracker::new()).await
}

/// Resolves and persists `events`, folding per-item failures into `tracker`.
pub async fn reconcile_events(
    state: &AppState,
    events: &[TrackedEvent],
    mut tracker: FailureTracker,
) -> Result<BatchResponse, AppError> {
    if events.is_empty() {
        return Ok(finish(state, tracker));
    }

    let logins: BTreeSet<String> = events.iter().map(|tracked| tracked.event.login()).collect();
    let resolver = IdentityResolver::new(
        state.identity_directory.as_ref(),
        state.config.lookup_batch_size,
    );
    let resolution = resolver.resolve(logins).await;

    for tracked in events {
        if let Some(reason) = resolution.failure(&tracked.event.login()) {
            tracker.record_all(&tracked.tokens, reason);
        }
    }

    let writer = ReconciliationWriter::new(
        state.account_repo.as_ref(),
        state.registration_repo.as_ref(),
        state.config.store_batch_write_limit,
    );
    let report = match writer.write(&resolution, events, &mut tracker).await {
        Ok(report) => report,
        Err(err) => {
            state.metrics.record_invocation_error();
            return Err(err);
        }
    };

    state.metrics.record_writes(&report);
    info!(
        events = events.len(),
        accounts_written = report.accounts.written(),
        links_written = report.links.written(),
        unchanged = report.links.unchanged,
        failures = tracker.len(),
        "reconciled batch"
    );
    Ok(finish(state, tracker))
}

/// Counts and logs the per-item failures, then hands back the retry subset.
pub(crate) fn finish(state: &AppState, tracker: FailureTracker) -> BatchResponse {
    let records = tracker.records();
    for record in &records {
        debug!(
            item = %record.input_item_id,
            reason = record.reason_code.as_str(),
            "item left for redelivery"
        );
    }
    state.metrics.record_item_failures(&records);
    tracker.into_response()
}
