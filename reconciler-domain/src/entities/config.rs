// Runtime configuration handed to the application layer

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub lookup_batch_size: usize,
    pub store_batch_write_limit: usize,
    pub queue_batch_size: usize,
    pub visibility_timeout_seconds: u64,
    pub consumer_enabled: bool,
    pub consumer_poll_interval_millis: u64,
    /// Deliveries of one event-queue message before it moves to the backlog.
    pub max_receive_count: u32,
    pub report_bucket: String,
    pub report_key_prefix: String,
    pub report_schedule_enabled: bool,
    pub report_hour: u32,
    pub report_minute: u32,
    pub report_webhook_url: Option<String>,
    pub report_webhook_template: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_seconds: 30,
            lookup_batch_size: 100,
            store_batch_write_limit: 25,
            queue_batch_size: 10,
            visibility_timeout_seconds: 60,
            consumer_enabled: true,
            consumer_poll_interval_millis: 1000,
            max_receive_count: 5,
            report_bucket: "ticket-reconciler-reports".to_string(),
            report_key_prefix: "error-reports".to_string(),
            report_schedule_enabled: true,
            report_hour: 6,
            report_minute: 0,
            report_webhook_url: None,
            report_webhook_template: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub helix_base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SpoolConfig {
    pub event_queue_dir: String,
    pub backlog_queue_dir: String,
    pub object_store_root: String,
}
