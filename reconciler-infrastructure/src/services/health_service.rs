use std::sync::Arc;

use async_trait::async_trait;
use reconciler_domain::ports::{HealthCheckService, MessageQueue};
use reconciler_domain::AccountRepository;

pub struct DefaultHealthService {
    account_repo: Arc<dyn AccountRepository>,
    queues: Vec<Arc<dyn MessageQueue>>,
}

impl DefaultHealthService {
    pub fn new(account_repo: Arc<dyn AccountRepository>, queues: Vec<Arc<dyn MessageQueue>>) -> Self {
        Self {
            account_repo,
            queues,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_database(&self) -> anyhow::Result<bool> {
        self.account_repo.ping().await.map(|_| true)
    }

    async fn check_queues(&self) -> anyhow::Result<bool> {
        for queue in &self.queues {
            queue.ping().await?;
        }
        Ok(true)
    }
}
