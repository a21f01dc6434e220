use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{
    DeleteOutcome, DirectoryUser, DlqReportResult, OutboundMessage, QueueMessage, SendOutcome,
};

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Batched lookup by login. Logins missing from the result are unresolved.
    async fn lookup_users(&self, logins: &[String]) -> anyhow::Result<Vec<DirectoryUser>>;
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send_batch(&self, messages: &[OutboundMessage]) -> anyhow::Result<SendOutcome>;
    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> anyhow::Result<Vec<QueueMessage>>;
    /// Deleting an already-deleted message is a no-op.
    async fn delete_batch(&self, receipt_handles: &[String]) -> anyhow::Result<DeleteOutcome>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, source: &Path) -> anyhow::Result<()>;
    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn notify_report(&self, result: &DlqReportResult) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_database(&self) -> anyhow::Result<bool>;
    async fn check_queues(&self) -> anyhow::Result<bool>;
}
