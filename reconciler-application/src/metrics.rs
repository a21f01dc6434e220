use std::sync::atomic::{AtomicU64, Ordering};

use reconciler_domain::{FailureReason, FailureRecord};

use crate::pipeline::WriteReport;

const REASON_SLOTS: usize = FailureReason::ALL.len();

#[derive(Debug, Default)]
pub struct Metrics {
    invocations: AtomicU64,
    invocation_errors: AtomicU64,
    records_received: AtomicU64,
    records_skipped: AtomicU64,
    item_failures: AtomicU64,
    item_failures_by_reason: [AtomicU64; REASON_SLOTS],
    accounts_written: AtomicU64,
    links_written: AtomicU64,
    messages_enqueued: AtomicU64,
    messages_acknowledged: AtomicU64,
    messages_redriven: AtomicU64,
    tickets_imported: AtomicU64,
    dlq_reports: AtomicU64,
    dlq_entries: AtomicU64,
    dlq_purged: AtomicU64,
}

impl Metrics {
    pub fn record_invocation(&self, received: usize, skipped: usize) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.records_received
            .fetch_add(received as u64, Ordering::Relaxed);
        self.records_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    pub fn record_invocation_error(&self) {
        self.invocation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_failures(&self, records: &[FailureRecord]) {
        self.item_failures
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        for record in records {
            if let Some(slot) = reason_slot(record.reason_code) {
                self.item_failures_by_reason[slot].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_writes(&self, report: &WriteReport) {
        self.accounts_written
            .fetch_add(report.accounts.written() as u64, Ordering::Relaxed);
        self.links_written
            .fetch_add(report.links.written() as u64, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self, count: usize) {
        self.messages_enqueued
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dlq_report(&self, entries: usize, purged: usize) {
        self.dlq_reports.fetch_add(1, Ordering::Relaxed);
        self.dlq_entries.fetch_add(entries as u64, Ordering::Relaxed);
        self.dlq_purged.fetch_add(purged as u64, Ordering::Relaxed);
    }

    pub fn record_consumed(&self, acknowledged: usize, redriven: usize) {
        self.messages_acknowledged
            .fetch_add(acknowledged as u64, Ordering::Relaxed);
        self.messages_redriven
            .fetch_add(redriven as u64, Ordering::Relaxed);
    }

    pub fn record_tickets_imported(&self, count: usize) {
        self.tickets_imported
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("reconciler_invocations_total", &self.invocations),
            ("reconciler_invocation_errors_total", &self.invocation_errors),
            ("reconciler_records_received_total", &self.records_received),
            ("reconciler_records_skipped_total", &self.records_skipped),
            ("reconciler_item_failures_total", &self.item_failures),
            ("reconciler_accounts_written_total", &self.accounts_written),
            ("reconciler_links_written_total", &self.links_written),
            ("reconciler_messages_enqueued_total", &self.messages_enqueued),
            ("reconciler_messages_acknowledged_total", &self.messages_acknowledged),
            ("reconciler_messages_redriven_total", &self.messages_redriven),
            ("reconciler_tickets_imported_total", &self.tickets_imported),
            ("reconciler_dlq_reports_total", &self.dlq_reports),
            ("reconciler_dlq_entries_total", &self.dlq_entries),
            ("reconciler_dlq_purged_total", &self.dlq_purged),
        ];

        let mut out = String::new();
        for (name, counter) in counters {
            out.push_str(&format!(
                "# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            ));
        }

        let name = "reconciler_item_failures_by_reason_total";
        out.push_str(&format!("# TYPE {name} counter\n"));
        for (reason, counter) in FailureReason::ALL.iter().zip(&self.item_failures_by_reason) {
            out.push_str(&format!(
                "{name}{{reason=\"{}\"}} {}\n",
                reason.as_str(),
                counter.load(Ordering::Relaxed)
            ));
        }
        out
    }
}

fn reason_slot(reason: FailureReason) -> Option<usize> {
    FailureReason::ALL.iter().position(|candidate| *candidate == reason)
}
