use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use reconciler_domain::{
    current_millis, DeleteFailure, DeleteOutcome, MessageQueue, OutboundMessage, QueueMessage,
    SendOutcome,
};

const MESSAGES_DIR: &str = "messages";
const LEASES_DIR: &str = "leases";

#[derive(Debug, Serialize, Deserialize)]
struct SpoolRecord {
    id: String,
    body: String,
    checksum: String,
    enqueued_at_millis: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Lease {
    nonce: String,
    expires_at_millis: i64,
    #[serde(default)]
    receive_count: u32,
}

/// A message file as found on disk. Files that fail to parse or fail their
/// checksum are still delivered, with an empty body, so consumers can report them.
#[derive(Debug)]
struct Pending {
    id: String,
    body: String,
    enqueued_at_millis: i64,
}

impl Lease {
    fn is_active(&self, now: i64) -> bool {
        self.expires_at_millis > now
    }
}

/// Directory-backed queue. One JSON file per message; a lease file next to it
/// hides the message from other receivers until the visibility timeout ends.
pub struct SpoolQueue {
    root: PathBuf,
}

impl SpoolQueue {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(MESSAGES_DIR))
            .await
            .with_context(|| format!("failed to create spool at {}", root.display()))?;
        fs::create_dir_all(root.join(LEASES_DIR)).await?;
        Ok(Self { root })
    }

    fn message_path(&self, id: &str) -> PathBuf {
        self.root.join(MESSAGES_DIR).join(format!("{id}.json"))
    }

    fn lease_path(&self, id: &str) -> PathBuf {
        self.root.join(LEASES_DIR).join(format!("{id}.lease"))
    }

    async fn enqueue(&self, body: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let record = SpoolRecord {
            id: id.clone(),
            body: body.to_string(),
            checksum: checksum(body),
            enqueued_at_millis: current_millis(),
        };
        let tmp = self.root.join(MESSAGES_DIR).join(format!(".{id}.tmp"));
        fs::write(&tmp, serde_json::to_vec(&record)?).await?;
        fs::rename(&tmp, self.message_path(&id)).await?;
        Ok(id)
    }

    async fn pending_messages(&self) -> Result<Vec<Pending>> {
        let mut pending = Vec::new();
        let mut entries = fs::read_dir(self.root.join(MESSAGES_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let content = match fs::read(&path).await {
                Ok(content) => content,
                // deleted by a concurrent receiver
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            match serde_json::from_slice::<SpoolRecord>(&content) {
                Ok(record) if record.checksum == checksum(&record.body) => pending.push(Pending {
                    id: id.to_string(),
                    body: record.body,
                    enqueued_at_millis: record.enqueued_at_millis,
                }),
                Ok(record) => {
                    warn!(id, "spool message failed checksum, delivering as undecodable");
                    pending.push(Pending {
                        id: id.to_string(),
                        body: String::new(),
                        enqueued_at_millis: record.enqueued_at_millis,
                    });
                }
                Err(err) => {
                    warn!(id, error = %err, "unreadable spool message, delivering as undecodable");
                    pending.push(Pending {
                        id: id.to_string(),
                        body: String::new(),
                        enqueued_at_millis: 0,
                    });
                }
            }
        }
        pending.sort_by(|a, b| (a.enqueued_at_millis, &a.id).cmp(&(b.enqueued_at_millis, &b.id)));
        Ok(pending)
    }

    async fn read_lease(&self, id: &str) -> Result<Option<Lease>> {
        match fs::read(self.lease_path(id)).await {
            Ok(content) => Ok(serde_json::from_slice(&content).ok()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// A fresh lease, or `None` while another receiver holds one. Expired leases
    /// are replaced and carry the delivery count forward.
    async fn acquire_lease(&self, id: &str, visibility: Duration, now: i64) -> Result<Option<Lease>> {
        let previous = self.read_lease(id).await?;
        if previous.as_ref().is_some_and(|lease| lease.is_active(now)) {
            return Ok(None);
        }
        let lease = Lease {
            nonce: Uuid::new_v4().simple().to_string(),
            expires_at_millis: now + visibility.as_millis() as i64,
            receive_count: previous.map_or(0, |lease| lease.receive_count) + 1,
        };
        fs::write(self.lease_path(id), serde_json::to_vec(&lease)?).await?;
        Ok(Some(lease))
    }

    async fn delete_one(&self, receipt_handle: &str) -> Result<()> {
        let (id, nonce) = receipt_handle
            .split_once(':')
            .ok_or_else(|| anyhow!("malformed receipt handle"))?;
        if !self.message_path(id).exists() {
            debug!(id, "spool message already deleted");
            return Ok(());
        }
        match self.read_lease(id).await? {
            Some(lease) if lease.nonce == nonce => {}
            _ => return Err(anyhow!("receipt handle is no longer valid")),
        }
        remove_if_present(&self.message_path(id)).await?;
        remove_if_present(&self.lease_path(id)).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for SpoolQueue {
    async fn send_batch(&self, messages: &[OutboundMessage]) -> Result<SendOutcome> {
        let mut outcome = SendOutcome::default();
        for message in messages {
            if let Err(err) = self.enqueue(&message.body).await {
                warn!(entry = %message.id, error = %err, "failed to spool message");
                outcome.failed.push(message.id.clone());
            }
        }
        Ok(outcome)
    }

    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>> {
        let now = current_millis();
        let mut received = Vec::new();
        for message in self.pending_messages().await? {
            if received.len() >= max_messages {
                break;
            }
            if let Some(lease) = self.acquire_lease(&message.id, visibility_timeout, now).await? {
                received.push(QueueMessage {
                    receipt_handle: format!("{}:{}", message.id, lease.nonce),
                    message_id: message.id,
                    body: message.body,
                    receive_count: lease.receive_count,
                });
            }
        }
        Ok(received)
    }

    async fn delete_batch(&self, receipt_handles: &[String]) -> Result<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();
        for handle in receipt_handles {
            match self.delete_one(handle).await {
                Ok(()) => outcome.deleted += 1,
                Err(err) => outcome.failed.push(DeleteFailure {
                    receipt_handle: handle.clone(),
                    reason: err.to_string(),
                }),
            }
        }
        Ok(outcome)
    }

    async fn ping(&self) -> Result<()> {
        let metadata = fs::metadata(self.root.join(MESSAGES_DIR)).await?;
        if !metadata.is_dir() {
            return Err(anyhow!("spool path {} is not a directory", self.root.display()));
        }
        Ok(())
    }
}

fn checksum(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
