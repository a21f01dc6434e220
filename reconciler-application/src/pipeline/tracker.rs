use std::collections::BTreeMap;

use reconciler_domain::{AckToken, BatchResponse, FailureReason, FailureRecord};

/// Per-invocation failure ledger. The first reason recorded for a token wins.
#[derive(Debug, Default)]
pub struct FailureTracker {
    failures: BTreeMap<AckToken, FailureReason>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, token: AckToken, reason: FailureReason) {
        self.failures.entry(token).or_insert(reason);
    }

    pub fn record_all<'a, I>(&mut self, tokens: I, reason: FailureReason)
    where
        I: IntoIterator<Item = &'a AckToken>,
    {
        for token in tokens {
            self.record(token.clone(), reason);
        }
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.failures
            .iter()
            .map(|(token, reason)| FailureRecord {
                input_item_id: token.clone(),
                reason_code: *reason,
            })
            .collect()
    }

    pub fn into_response(self) -> BatchResponse {
        BatchResponse {
            failed_items: self.failures.into_keys().collect(),
        }
    }
}
