use anyhow::Result;
use async_trait::async_trait;
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use reconciler_domain::{
    AccountRepository, BatchWriteOutcome, ExternalAccount, RegistrationLink,
    RegistrationRepository, Ticket, TicketKey, TicketRepository,
};

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct ExternalAccountRow {
    pub external_id: i64,
    pub login_name: String,
    pub display_name: String,
    pub account_type: String,
    pub tier: String,
    pub description: String,
    pub created_at_epoch_millis: i64,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub updated_at: OffsetDateTime,
}

impl ExternalAccountRow {
    fn from_account(account: &ExternalAccount, updated_at: OffsetDateTime) -> Self {
        Self {
            external_id: account.external_id,
            login_name: account.login_name.clone(),
            display_name: account.display_name.clone(),
            account_type: account.account_type.clone(),
            tier: account.tier.clone(),
            description: account.description.clone(),
            created_at_epoch_millis: account.created_at_epoch_millis,
            updated_at,
        }
    }
}

impl From<ExternalAccountRow> for ExternalAccount {
    fn from(row: ExternalAccountRow) -> Self {
        Self {
            external_id: row.external_id,
            login_name: row.login_name,
            display_name: row.display_name,
            account_type: row.account_type,
            tier: row.tier,
            description: row.description,
            created_at_epoch_millis: row.created_at_epoch_millis,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct RegistrationRow {
    pub event_id: i64,
    pub ticket_id: i64,
    pub external_account_id: i64,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct TicketRow {
    pub event_id: i64,
    pub id: i64,
    pub ticket_number: String,
    pub purchaser_name: String,
    pub order_number: String,
    pub ticket_type: String,
    pub access_code: String,
    pub price_cents: i64,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub updated_at: OffsetDateTime,
}

impl TicketRow {
    fn from_ticket(ticket: &Ticket, updated_at: OffsetDateTime) -> Self {
        Self {
            event_id: ticket.event_id,
            id: ticket.id,
            ticket_number: ticket.ticket_number.clone(),
            purchaser_name: ticket.purchaser_name.clone(),
            order_number: ticket.order_number.clone(),
            ticket_type: ticket.ticket_type.clone(),
            access_code: ticket.access_code.clone(),
            price_cents: ticket.price_cents,
            updated_at,
        }
    }
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            event_id: row.event_id,
            id: row.id,
            ticket_number: row.ticket_number,
            purchaser_name: row.purchaser_name,
            order_number: row.order_number,
            ticket_type: row.ticket_type,
            access_code: row.access_code,
            price_cents: row.price_cents,
        }
    }
}

const TICKET_COLUMNS: &str = "event_id, id, ticket_number, purchaser_name, order_number, \
     ticket_type, access_code, price_cents, updated_at";

#[derive(Clone)]
pub struct ClickhouseRepo {
    client: Client,
    database: String,
}

impl ClickhouseRepo {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        let create_accounts = r#"
CREATE TABLE IF NOT EXISTS external_accounts (
    external_id Int64,
    login_name String,
    display_name String,
    account_type String,
    tier String,
    description String,
    created_at_epoch_millis Int64,
    updated_at DateTime64(3)
) ENGINE = ReplacingMergeTree(updated_at)
ORDER BY external_id
"#;
        self.client.query(create_accounts).execute().await?;

        let create_registrations = r#"
CREATE TABLE IF NOT EXISTS event_registrations (
    event_id Int64,
    ticket_id Int64,
    external_account_id Int64,
    updated_at DateTime64(3)
) ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (event_id, ticket_id)
"#;
        self.client.query(create_registrations).execute().await?;

        let create_tickets = r#"
CREATE TABLE IF NOT EXISTS tickets (
    event_id Int64,
    id Int64,
    ticket_number String,
    purchaser_name String,
    order_number String,
    ticket_type String,
    access_code String,
    price_cents Int64,
    updated_at DateTime64(3)
) ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (event_id, id)
"#;
        self.client.query(create_tickets).execute().await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for ClickhouseRepo {
    async fn ensure_schema(&self) -> Result<()> {
        ClickhouseRepo::ensure_schema(self).await
    }

    async fn fetch_accounts(&self, external_ids: &[i64]) -> Result<Vec<ExternalAccount>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT external_id, login_name, display_name, account_type, tier, description, \
             created_at_epoch_millis, updated_at \
             FROM external_accounts FINAL WHERE external_id IN ({})",
            id_list(external_ids)
        );
        let rows = self
            .client
            .query(&query)
            .fetch_all::<ExternalAccountRow>()
            .await?;
        Ok(rows.into_iter().map(ExternalAccount::from).collect())
    }

    async fn write_accounts(
        &self,
        accounts: &[ExternalAccount],
    ) -> Result<BatchWriteOutcome<ExternalAccount>> {
        let updated_at = OffsetDateTime::now_utc();
        let mut insert = self.client.insert("external_accounts")?;
        for account in accounts {
            insert
                .write(&ExternalAccountRow::from_account(account, updated_at))
                .await?;
        }
        insert.end().await?;
        Ok(BatchWriteOutcome::complete())
    }

    async fn ping(&self) -> Result<()> {
        ClickhouseRepo::ping(self).await
    }
}

#[async_trait]
impl RegistrationRepository for ClickhouseRepo {
    async fn fetch_registrations(&self, keys: &[TicketKey]) -> Result<Vec<RegistrationLink>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT event_id, ticket_id, external_account_id, updated_at \
             FROM event_registrations FINAL WHERE (event_id, ticket_id) IN ({})",
            key_list(keys)
        );
        let rows = self
            .client
            .query(&query)
            .fetch_all::<RegistrationRow>()
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RegistrationLink {
                event_id: row.event_id,
                ticket_id: row.ticket_id,
                external_account_id: row.external_account_id,
            })
            .collect())
    }

    async fn write_registrations(
        &self,
        links: &[RegistrationLink],
    ) -> Result<BatchWriteOutcome<RegistrationLink>> {
        let updated_at = OffsetDateTime::now_utc();
        let mut insert = self.client.insert("event_registrations")?;
        for link in links {
            insert
                .write(&RegistrationRow {
                    event_id: link.event_id,
                    ticket_id: link.ticket_id,
                    external_account_id: link.external_account_id,
                    updated_at,
                })
                .await?;
        }
        insert.end().await?;
        Ok(BatchWriteOutcome::complete())
    }
}

#[async_trait]
impl TicketRepository for ClickhouseRepo {
    async fn get_ticket(&self, key: TicketKey) -> Result<Option<Ticket>> {
        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets FINAL WHERE event_id = {} AND id = {} LIMIT 1",
            key.event_id, key.ticket_id
        );
        let row = self
            .client
            .query(&query)
            .fetch_optional::<TicketRow>()
            .await?;
        Ok(row.map(Ticket::from))
    }

    async fn fetch_tickets(&self, keys: &[TicketKey]) -> Result<Vec<Ticket>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets FINAL WHERE (event_id, id) IN ({})",
            key_list(keys)
        );
        let rows = self.client.query(&query).fetch_all::<TicketRow>().await?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn write_tickets(&self, tickets: &[Ticket]) -> Result<BatchWriteOutcome<Ticket>> {
        let updated_at = OffsetDateTime::now_utc();
        let mut insert = self.client.insert("tickets")?;
        for ticket in tickets {
            insert.write(&TicketRow::from_ticket(ticket, updated_at)).await?;
        }
        insert.end().await?;
        Ok(BatchWriteOutcome::complete())
    }
}

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_list(keys: &[TicketKey]) -> String {
    keys.iter()
        .map(|key| format!("({}, {})", key.event_id, key.ticket_id))
        .collect::<Vec<_>>()
        .join(", ")
}
