use std::collections::{BTreeMap, BTreeSet, HashMap};

use reconciler_domain::{
    AccountRepository, ExternalAccount, FailureReason, RegistrationLink, RegistrationRepository,
    TicketKey, TrackedEvent,
};
use tracing::{debug, warn};

use crate::pipeline::{FailureTracker, Resolution};
use crate::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl UpsertCounts {
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub accounts: UpsertCounts,
    pub links: UpsertCounts,
}

/// Items selected for writing, split into inserts and updates.
pub(crate) struct UpsertPlan<T> {
    inserts: Vec<T>,
    updates: Vec<T>,
    pub(crate) unchanged: usize,
}

impl<T: Clone + PartialEq> UpsertPlan<T> {
    pub(crate) fn build<K: Ord>(desired: &BTreeMap<K, T>, current: &HashMap<K, T>) -> Self
    where
        K: std::hash::Hash + Eq,
    {
        let mut plan = Self {
            inserts: Vec::new(),
            updates: Vec::new(),
            unchanged: 0,
        };
        for (key, item) in desired {
            match current.get(key) {
                None => plan.inserts.push(item.clone()),
                Some(existing) if existing != item => plan.updates.push(item.clone()),
                Some(_) => plan.unchanged += 1,
            }
        }
        plan
    }

    pub(crate) fn pending(&self) -> Vec<T> {
        self.inserts.iter().chain(self.updates.iter()).cloned().collect()
    }
}

pub struct ReconciliationWriter<'a> {
    accounts: &'a dyn AccountRepository,
    registrations: &'a dyn RegistrationRepository,
    batch_write_limit: usize,
}

impl<'a> ReconciliationWriter<'a> {
    pub fn new(
        accounts: &'a dyn AccountRepository,
        registrations: &'a dyn RegistrationRepository,
        batch_write_limit: usize,
    ) -> Self {
        Self {
            accounts,
            registrations,
            batch_write_limit: batch_write_limit.max(1),
        }
    }

    /// Persists accounts and then links for every event whose login resolved.
    /// Per-item problems land in `tracker`; an unreachable store is an error.
    pub async fn write(
        &self,
        resolution: &Resolution,
        events: &[TrackedEvent],
        tracker: &mut FailureTracker,
    ) -> Result<WriteReport, AppError> {
        let mut report = WriteReport::default();

        let mut resolved: Vec<(&TrackedEvent, &ExternalAccount)> = Vec::new();
        for tracked in events {
            let login = tracked.event.login();
            if resolution.failure(&login).is_some() {
                continue;
            }
            match resolution.account(&login) {
                Some(account) => resolved.push((tracked, account)),
                None => {
                    debug!(login = %login, key = %tracked.event.key(), "account not found");
                    tracker.record_all(&tracked.tokens, FailureReason::AccountNotFound);
                }
            }
        }
        if resolved.is_empty() {
            return Ok(report);
        }

        let desired_accounts: BTreeMap<i64, ExternalAccount> = resolved
            .iter()
            .map(|(_, account)| (account.external_id, (*account).clone()))
            .collect();
        let (account_counts, failed_accounts) = self.upsert_accounts(&desired_accounts).await?;
        report.accounts = account_counts;

        let mut desired_links: BTreeMap<TicketKey, RegistrationLink> = BTreeMap::new();
        for (tracked, account) in &resolved {
            if failed_accounts.contains(&account.external_id) {
                tracker.record_all(&tracked.tokens, FailureReason::PersistFailure);
                continue;
            }
            let link = RegistrationLink {
                event_id: tracked.event.event_id,
                ticket_id: tracked.event.ticket_id,
                external_account_id: account.external_id,
            };
            desired_links.insert(link.key(), link);
        }
        if desired_links.is_empty() {
            return Ok(report);
        }

        let (link_counts, failed_links) = self.upsert_links(&desired_links).await?;
        report.links = link_counts;
        for (tracked, _) in &resolved {
            if failed_links.contains(&tracked.event.key()) {
                tracker.record_all(&tracked.tokens, FailureReason::PersistFailure);
            }
        }

        Ok(report)
    }

    async fn upsert_accounts(
        &self,
        desired: &BTreeMap<i64, ExternalAccount>,
    ) -> Result<(UpsertCounts, BTreeSet<i64>), AppError> {
        let ids: Vec<i64> = desired.keys().copied().collect();
        let current: HashMap<i64, ExternalAccount> = self
            .accounts
            .fetch_accounts(&ids)
            .await
            .map_err(|err| AppError::unavailable("account store", err))?
            .into_iter()
            .map(|account| (account.external_id, account))
            .collect();

        let plan = UpsertPlan::build(desired, &current);
        let pending = plan.pending();
        let mut failed = BTreeSet::new();
        let mut chunk_errors = 0;
        let chunks = pending.chunks(self.batch_write_limit);
        let chunk_count = chunks.len();

        for chunk in chunks {
            match self.accounts.write_accounts(chunk).await {
                Ok(outcome) => {
                    for account in outcome.unprocessed {
                        warn!(external_id = account.external_id, "account write left unprocessed");
                        failed.insert(account.external_id);
                    }
                }
                Err(err) => {
                    warn!(accounts = chunk.len(), error = %err, "account batch write failed");
                    chunk_errors += 1;
                    failed.extend(chunk.iter().map(|account| account.external_id));
                }
            }
        }
        if chunk_count > 0 && chunk_errors == chunk_count {
            return Err(AppError::unavailable(
                "account store",
                anyhow::anyhow!("every account write batch failed"),
            ));
        }

        Ok((counts(&plan, |account| failed.contains(&account.external_id)), failed))
    }

    async fn upsert_links(
        &self,
        desired: &BTreeMap<TicketKey, RegistrationLink>,
    ) -> Result<(UpsertCounts, BTreeSet<TicketKey>), AppError> {
        let keys: Vec<TicketKey> = desired.keys().copied().collect();
        let current: HashMap<TicketKey, RegistrationLink> = self
            .registrations
            .fetch_registrations(&keys)
            .await
            .map_err(|err| AppError::unavailable("registration store", err))?
            .into_iter()
            .map(|link| (link.key(), link))
            .collect();

        let plan = UpsertPlan::build(desired, &current);
        let pending = plan.pending();
        let mut failed = BTreeSet::new();
        let mut chunk_errors = 0;
        let chunks = pending.chunks(self.batch_write_limit);
        let chunk_count = chunks.len();

        for chunk in chunks {
            match self.registrations.write_registrations(chunk).await {
                Ok(outcome) => {
                    for link in outcome.unprocessed {
                        warn!(key = %link.key(), "registration write left unprocessed");
                        failed.insert(link.key());
                    }
                }
                Err(err) => {
                    warn!(links = chunk.len(), error = %err, "registration batch write failed");
                    chunk_errors += 1;
                    failed.extend(chunk.iter().map(RegistrationLink::key));
                }
            }
        }
        if chunk_count > 0 && chunk_errors == chunk_count {
            return Err(AppError::unavailable(
                "registration store",
                anyhow::anyhow!("every registration write batch failed"),
            ));
        }

        Ok((counts(&plan, |link| failed.contains(&link.key())), failed))
    }
}

fn counts<T>(plan: &UpsertPlan<T>, is_failed: impl Fn(&T) -> bool) -> UpsertCounts {
    let failed_inserts = plan.inserts.iter().filter(|item| is_failed(item)).count();
    let failed_updates = plan.updates.iter().filter(|item| is_failed(item)).count();
    UpsertCounts {
        inserted: plan.inserts.len() - failed_inserts,
        updated: plan.updates.len() - failed_updates,
        unchanged: plan.unchanged,
        failed: failed_inserts + failed_updates,
    }
}
