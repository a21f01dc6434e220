use std::sync::Arc;

use anyhow::Result;
use clickhouse::Client;
use tracing::info;

use reconciler_application::{AppState, Metrics};
use reconciler_domain::MessageQueue;
use reconciler_infrastructure::{
    AppConfig, ClickhouseRepo, DefaultHealthService, FsObjectStore, HelixDirectory, SpoolQueue,
    WebhookNotifier,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();
        let spool_config = config.to_spool_config();

        let mut clickhouse = Client::default()
            .with_url(&db_config.clickhouse_url)
            .with_database(&db_config.clickhouse_database);
        if let Some(user) = &db_config.clickhouse_user {
            clickhouse = clickhouse.with_user(user);
        }
        if let Some(password) = &db_config.clickhouse_password {
            clickhouse = clickhouse.with_password(password);
        }

        let repo = Arc::new(ClickhouseRepo::new(
            clickhouse,
            db_config.clickhouse_database.clone(),
        ));
        repo.ensure_schema().await?;

        let event_queue: Arc<dyn MessageQueue> =
            Arc::new(SpoolQueue::open(&spool_config.event_queue_dir).await?);
        let backlog_queue: Arc<dyn MessageQueue> =
            Arc::new(SpoolQueue::open(&spool_config.backlog_queue_dir).await?);
        info!(
            events = %spool_config.event_queue_dir,
            backlog = %spool_config.backlog_queue_dir,
            "spool queues ready"
        );

        let health_service = Arc::new(DefaultHealthService::new(
            repo.clone(),
            vec![event_queue.clone(), backlog_queue.clone()],
        ));

        let state = AppState {
            identity_directory: Arc::new(HelixDirectory::new(config.to_identity_config())?),
            account_repo: repo.clone(),
            registration_repo: repo.clone(),
            ticket_repo: repo,
            event_queue,
            backlog_queue,
            object_store: Arc::new(FsObjectStore::new(&spool_config.object_store_root)),
            report_notifier: Arc::new(WebhookNotifier::new(&runtime_config)?),
            health_service,
            metrics: Arc::new(Metrics::default()),
            config: runtime_config,
        };

        Ok(Self { state })
    }
}
