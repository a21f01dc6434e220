// In-memory fakes of the domain ports for application tests

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reconciler_domain::{
    AccountRepository, AckToken, BatchWriteOutcome, DeleteFailure, DeleteOutcome, DirectoryUser,
    DlqReportResult, ExternalAccount, FailureReason, HealthCheckService, IdentityDirectory,
    MessageQueue, ObjectStore, OutboundMessage, QueueMessage, RegistrationLink,
    RegistrationRepository, ReportNotifier, RuntimeConfig, SendOutcome, Ticket, TicketEvent,
    TicketKey, TicketRepository, TrackedEvent,
};

use crate::pipeline::FailureTracker;
use crate::{AppState, Metrics};

pub fn account(external_id: i64, login: &str) -> ExternalAccount {
    ExternalAccount {
        external_id,
        login_name: login.to_string(),
        display_name: login.to_string(),
        account_type: String::new(),
        tier: String::new(),
        description: String::new(),
        created_at_epoch_millis: 0,
    }
}

pub fn tracked(event_id: i64, ticket_id: i64, purchaser_name: &str, token: &str) -> TrackedEvent {
    TrackedEvent {
        event: TicketEvent {
            event_id,
            ticket_id,
            purchaser_name: purchaser_name.to_string(),
            ticket_number: Some(format!("T-{ticket_id}")),
        },
        tokens: vec![AckToken::from(token)],
    }
}

pub fn ticket(event_id: i64, id: i64, ticket_number: &str, purchaser_name: &str) -> Ticket {
    Ticket {
        event_id,
        id,
        ticket_number: ticket_number.to_string(),
        purchaser_name: purchaser_name.to_string(),
        order_number: String::new(),
        ticket_type: String::new(),
        access_code: String::new(),
        price_cents: 0,
    }
}

pub fn reason_of(tracker: &FailureTracker, token: &str) -> Option<FailureReason> {
    tracker
        .records()
        .into_iter()
        .find(|record| record.input_item_id.as_str() == token)
        .map(|record| record.reason_code)
}

#[derive(Default)]
pub struct FakeDirectory {
    users: HashMap<String, DirectoryUser>,
    fail_batches: bool,
    failing_logins: HashSet<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeDirectory {
    pub fn with_users(users: &[(&str, i64)]) -> Self {
        Self::from_pairs(
            users
                .iter()
                .map(|(login, id)| (login.to_string(), *id))
                .collect(),
        )
    }

    pub fn from_pairs(users: Vec<(String, i64)>) -> Self {
        let users = users
            .into_iter()
            .map(|(login, id)| {
                let user = DirectoryUser {
                    id,
                    login: login.clone(),
                    display_name: login.clone(),
                    user_type: String::new(),
                    broadcaster_type: String::new(),
                    description: String::new(),
                    created_at_epoch_millis: 0,
                };
                (login, user)
            })
            .collect();
        Self {
            users,
            ..Self::default()
        }
    }

    /// Any lookup of more than one login errors.
    pub fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    pub fn failing_login(mut self, login: &str) -> Self {
        self.failing_logins.insert(login.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    async fn lookup_users(&self, logins: &[String]) -> anyhow::Result<Vec<DirectoryUser>> {
        self.calls.lock().unwrap().push(logins.to_vec());
        if self.fail_batches && logins.len() > 1 {
            anyhow::bail!("directory rejected batch");
        }
        if logins.iter().any(|login| self.failing_logins.contains(login)) {
            anyhow::bail!("directory timeout");
        }
        Ok(logins
            .iter()
            .filter_map(|login| self.users.get(login).cloned())
            .collect())
    }
}

#[derive(Default)]
struct StoreInner {
    accounts: BTreeMap<i64, ExternalAccount>,
    links: BTreeMap<TicketKey, RegistrationLink>,
    tickets: BTreeMap<TicketKey, Ticket>,
    unprocessed_accounts: HashSet<i64>,
    unprocessed_links: HashSet<TicketKey>,
    failing_account_writes: HashSet<usize>,
    fail_reads: bool,
    fail_ticket_reads: bool,
    account_write_calls: usize,
    link_write_sizes: Vec<usize>,
    ticket_write_sizes: Vec<usize>,
    max_write_size: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn seed_account(&self, account: ExternalAccount) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(account.external_id, account);
    }

    pub fn seed_ticket(&self, ticket: Ticket) {
        self.inner.lock().unwrap().tickets.insert(ticket.key(), ticket);
    }

    pub fn leave_account_unprocessed(&self, external_id: i64) {
        self.inner
            .lock()
            .unwrap()
            .unprocessed_accounts
            .insert(external_id);
    }

    pub fn leave_link_unprocessed(&self, key: TicketKey) {
        self.inner.lock().unwrap().unprocessed_links.insert(key);
    }

    /// The `call`-th account write (1-based) errors.
    pub fn fail_account_write_call(&self, call: usize) {
        self.inner
            .lock()
            .unwrap()
            .failing_account_writes
            .insert(call);
    }

    pub fn fail_reads(&self) {
        self.inner.lock().unwrap().fail_reads = true;
    }

    pub fn fail_ticket_reads(&self) {
        self.inner.lock().unwrap().fail_ticket_reads = true;
    }

    pub fn account(&self, external_id: i64) -> Option<ExternalAccount> {
        self.inner.lock().unwrap().accounts.get(&external_id).cloned()
    }

    pub fn accounts(&self) -> Vec<ExternalAccount> {
        self.inner.lock().unwrap().accounts.values().cloned().collect()
    }

    pub fn links(&self) -> Vec<RegistrationLink> {
        self.inner.lock().unwrap().links.values().cloned().collect()
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.inner.lock().unwrap().tickets.values().cloned().collect()
    }

    pub fn account_write_calls(&self) -> usize {
        self.inner.lock().unwrap().account_write_calls
    }

    pub fn link_write_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().link_write_sizes.clone()
    }

    pub fn ticket_write_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().ticket_write_sizes.clone()
    }

    pub fn max_write_size(&self) -> usize {
        self.inner.lock().unwrap().max_write_size
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn fetch_accounts(&self, external_ids: &[i64]) -> anyhow::Result<Vec<ExternalAccount>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            anyhow::bail!("store unreachable");
        }
        Ok(external_ids
            .iter()
            .filter_map(|id| inner.accounts.get(id).cloned())
            .collect())
    }

    async fn write_accounts(
        &self,
        accounts: &[ExternalAccount],
    ) -> anyhow::Result<BatchWriteOutcome<ExternalAccount>> {
        let mut inner = self.inner.lock().unwrap();
        inner.account_write_calls += 1;
        inner.max_write_size = inner.max_write_size.max(accounts.len());
        if inner.failing_account_writes.contains(&inner.account_write_calls) {
            anyhow::bail!("throttled");
        }
        let mut outcome = BatchWriteOutcome::complete();
        for account in accounts {
            if inner.unprocessed_accounts.contains(&account.external_id) {
                outcome.unprocessed.push(account.clone());
            } else {
                inner.accounts.insert(account.external_id, account.clone());
            }
        }
        Ok(outcome)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryStore {
    async fn fetch_registrations(&self, keys: &[TicketKey]) -> anyhow::Result<Vec<RegistrationLink>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            anyhow::bail!("store unreachable");
        }
        Ok(keys
            .iter()
            .filter_map(|key| inner.links.get(key).cloned())
            .collect())
    }

    async fn write_registrations(
        &self,
        links: &[RegistrationLink],
    ) -> anyhow::Result<BatchWriteOutcome<RegistrationLink>> {
        let mut inner = self.inner.lock().unwrap();
        inner.max_write_size = inner.max_write_size.max(links.len());
        inner.link_write_sizes.push(links.len());
        let mut outcome = BatchWriteOutcome::complete();
        for link in links {
            if inner.unprocessed_links.contains(&link.key()) {
                outcome.unprocessed.push(link.clone());
            } else {
                inner.links.insert(link.key(), link.clone());
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn get_ticket(&self, key: TicketKey) -> anyhow::Result<Option<Ticket>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_ticket_reads {
            anyhow::bail!("ticket table unreachable");
        }
        Ok(inner.tickets.get(&key).cloned())
    }

    async fn fetch_tickets(&self, keys: &[TicketKey]) -> anyhow::Result<Vec<Ticket>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_ticket_reads {
            anyhow::bail!("ticket table unreachable");
        }
        Ok(keys
            .iter()
            .filter_map(|key| inner.tickets.get(key).cloned())
            .collect())
    }

    async fn write_tickets(&self, tickets: &[Ticket]) -> anyhow::Result<BatchWriteOutcome<Ticket>> {
        let mut inner = self.inner.lock().unwrap();
        inner.ticket_write_sizes.push(tickets.len());
        for ticket in tickets {
            inner.tickets.insert(ticket.key(), ticket.clone());
        }
        Ok(BatchWriteOutcome::complete())
    }
}

#[derive(Default)]
struct QueueInner {
    visible: VecDeque<QueueMessage>,
    in_flight: HashMap<String, QueueMessage>,
    sent: Vec<OutboundMessage>,
    send_sizes: Vec<usize>,
    next_id: usize,
    rejected_ids: HashSet<String>,
    undeletable_ids: HashSet<String>,
    stray_failures: Vec<String>,
    fail_sends: bool,
    receive_sizes: Vec<usize>,
    delete_sizes: Vec<usize>,
    deleted: usize,
}

impl QueueInner {
    fn push(&mut self, body: String) {
        let message_id = format!("m{}", self.next_id);
        self.next_id += 1;
        self.visible.push_back(QueueMessage {
            message_id,
            receipt_handle: String::new(),
            body,
            receive_count: 0,
        });
    }
}

/// Received messages stay hidden until deleted or until `expire_leases`.
/// Every send also makes the message receivable.
#[derive(Default)]
pub struct InMemoryQueue {
    inner: Mutex<QueueInner>,
}

impl InMemoryQueue {
    /// Message ids are `m0`, `m1`, ... in body order.
    pub fn with_bodies(bodies: Vec<String>) -> Self {
        let queue = Self::default();
        {
            let mut inner = queue.inner.lock().unwrap();
            for body in bodies {
                inner.push(body);
            }
        }
        queue
    }

    pub fn reject_id(&self, id: &str) {
        self.inner.lock().unwrap().rejected_ids.insert(id.to_string());
    }

    /// Adds `id` to every send outcome's failures, whether or not it was sent.
    pub fn report_stray_failure(&self, id: &str) {
        self.inner.lock().unwrap().stray_failures.push(id.to_string());
    }

    pub fn fail_deletes_of(&self, message_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .undeletable_ids
            .insert(message_id.to_string());
    }

    pub fn fail_sends(&self) {
        self.inner.lock().unwrap().fail_sends = true;
    }

    /// Makes every in-flight message receivable again.
    pub fn expire_leases(&self) {
        let mut inner = self.inner.lock().unwrap();
        let mut expired: Vec<QueueMessage> = inner.in_flight.drain().map(|(_, m)| m).collect();
        expired.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        inner.visible.extend(expired);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn send_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().send_sizes.clone()
    }

    pub fn receive_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().receive_sizes.clone()
    }

    pub fn delete_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().delete_sizes.clone()
    }

    pub fn deleted(&self) -> usize {
        self.inner.lock().unwrap().deleted
    }

    pub fn remaining(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.visible.len() + inner.in_flight.len()
    }

    pub fn bodies(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .visible
            .iter()
            .chain(inner.in_flight.values())
            .map(|message| message.body.clone())
            .collect()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send_batch(&self, messages: &[OutboundMessage]) -> anyhow::Result<SendOutcome> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            anyhow::bail!("queue unreachable");
        }
        inner.send_sizes.push(messages.len());
        let mut outcome = SendOutcome::default();
        for message in messages {
            if inner.rejected_ids.contains(&message.id) {
                outcome.failed.push(message.id.clone());
            } else {
                inner.sent.push(message.clone());
                inner.push(message.body.clone());
            }
        }
        outcome.failed.extend(inner.stray_failures.iter().cloned());
        Ok(outcome)
    }

    async fn receive(
        &self,
        max_messages: usize,
        _visibility_timeout: Duration,
    ) -> anyhow::Result<Vec<QueueMessage>> {
        let mut inner = self.inner.lock().unwrap();
        let take = max_messages.min(inner.visible.len());
        let mut batch: Vec<QueueMessage> = inner.visible.drain(..take).collect();
        for message in &mut batch {
            message.receive_count += 1;
            message.receipt_handle = format!("{}-r{}", message.message_id, message.receive_count);
            inner
                .in_flight
                .insert(message.receipt_handle.clone(), message.clone());
        }
        inner.receive_sizes.push(batch.len());
        Ok(batch)
    }

    async fn delete_batch(&self, receipt_handles: &[String]) -> anyhow::Result<DeleteOutcome> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_sizes.push(receipt_handles.len());
        let mut outcome = DeleteOutcome::default();
        for handle in receipt_handles {
            let undeletable = inner
                .in_flight
                .get(handle)
                .is_some_and(|message| inner.undeletable_ids.contains(&message.message_id));
            if undeletable || handle.is_empty() {
                outcome.failed.push(DeleteFailure {
                    receipt_handle: handle.clone(),
                    reason: "delete rejected".to_string(),
                });
            } else if inner.in_flight.remove(handle).is_some() {
                inner.deleted += 1;
                outcome.deleted += 1;
            }
        }
        Ok(outcome)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), String>>,
    fail_puts: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn fail_puts(&self) {
        *self.fail_puts.lock().unwrap() = true;
    }

    pub fn put_text(&self, bucket: &str, key: &str, content: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), content.to_string());
    }

    pub fn objects(&self) -> BTreeMap<(String, String), String> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, source: &Path) -> anyhow::Result<()> {
        if *self.fail_puts.lock().unwrap() {
            anyhow::bail!("bucket unreachable");
        }
        let body = tokio::fs::read_to_string(source).await?;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| anyhow::anyhow!("no such object {bucket}/{key}"))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<DlqReportResult>>,
}

impl RecordingNotifier {
    pub fn notified(&self) -> Vec<DlqReportResult> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportNotifier for RecordingNotifier {
    async fn notify_report(&self, result: &DlqReportResult) -> anyhow::Result<()> {
        self.notified.lock().unwrap().push(result.clone());
        Ok(())
    }
}

pub struct NoopHealth;

#[async_trait]
impl HealthCheckService for NoopHealth {
    async fn check_database(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn check_queues(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Shared fakes behind one `AppState`, kept around for assertions.
pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<InMemoryStore>,
    pub events: Arc<InMemoryQueue>,
    pub backlog: Arc<InMemoryQueue>,
    pub objects: Arc<MemoryObjectStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new(directory: FakeDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
            store: Arc::new(InMemoryStore::default()),
            events: Arc::new(InMemoryQueue::default()),
            backlog: Arc::new(InMemoryQueue::default()),
            objects: Arc::new(MemoryObjectStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn with_events(mut self, events: InMemoryQueue) -> Self {
        self.events = Arc::new(events);
        self
    }

    pub fn with_backlog(mut self, backlog: InMemoryQueue) -> Self {
        self.backlog = Arc::new(backlog);
        self
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: RuntimeConfig::default(),
            identity_directory: self.directory.clone(),
            account_repo: self.store.clone(),
            registration_repo: self.store.clone(),
            ticket_repo: self.store.clone(),
            event_queue: self.events.clone(),
            backlog_queue: self.backlog.clone(),
            object_store: self.objects.clone(),
            report_notifier: self.notifier.clone(),
            health_service: Arc::new(NoopHealth),
            metrics: self.metrics.clone(),
        }
    }
}
