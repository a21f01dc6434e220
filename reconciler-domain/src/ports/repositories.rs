use async_trait::async_trait;

use crate::entities::{BatchWriteOutcome, ExternalAccount, RegistrationLink, Ticket};
use crate::value_objects::TicketKey;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn fetch_accounts(&self, external_ids: &[i64]) -> anyhow::Result<Vec<ExternalAccount>>;
    /// One batched write; at most the store's batch-write limit per call.
    async fn write_accounts(
        &self,
        accounts: &[ExternalAccount],
    ) -> anyhow::Result<BatchWriteOutcome<ExternalAccount>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn fetch_registrations(&self, keys: &[TicketKey]) -> anyhow::Result<Vec<RegistrationLink>>;
    async fn write_registrations(
        &self,
        links: &[RegistrationLink],
    ) -> anyhow::Result<BatchWriteOutcome<RegistrationLink>>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn get_ticket(&self, key: TicketKey) -> anyhow::Result<Option<Ticket>>;
    async fn fetch_tickets(&self, keys: &[TicketKey]) -> anyhow::Result<Vec<Ticket>>;
    async fn write_tickets(&self, tickets: &[Ticket]) -> anyhow::Result<BatchWriteOutcome<Ticket>>;
}
