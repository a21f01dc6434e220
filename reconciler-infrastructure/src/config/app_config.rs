use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use reconciler_domain::{DbConfig, IdentityConfig, RuntimeConfig, SpoolConfig};

use crate::config::{validate_bucket_name, validate_key_prefix, validate_range};

const MAX_LOOKUP_BATCH: usize = 100;
const MAX_STORE_BATCH_WRITE: usize = 25;
const MAX_QUEUE_BATCH: usize = 10;
const MAX_RECEIVE_COUNT: usize = 1000;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub log_dir: Option<String>,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub helix_base_url: String,
    pub helix_token_url: String,
    pub helix_client_id: String,
    pub helix_client_secret: Option<String>,
    pub helix_access_token: Option<String>,
    pub event_queue_dir: String,
    pub backlog_queue_dir: String,
    pub object_store_root: String,
    pub report_bucket: String,
    pub report_key_prefix: String,
    pub report_schedule_enabled: bool,
    pub report_hour: u32,
    pub report_minute: u32,
    pub report_webhook_url: Option<String>,
    pub report_webhook_template: Option<String>,
    pub lookup_batch_size: usize,
    pub store_batch_write_limit: usize,
    pub queue_batch_size: usize,
    pub visibility_timeout_seconds: u64,
    pub consumer_enabled: bool,
    pub consumer_poll_interval_millis: u64,
    pub max_receive_count: u32,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            bind_addr: runtime.bind_addr,
            api_token: None,
            log_dir: None,
            clickhouse_url: "http://127.0.0.1:8123".to_string(),
            clickhouse_database: "reconciler".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            helix_base_url: "https://api.twitch.tv/helix".to_string(),
            helix_token_url: "https://id.twitch.tv/oauth2/token".to_string(),
            helix_client_id: String::new(),
            helix_client_secret: None,
            helix_access_token: None,
            event_queue_dir: "./spool/events".to_string(),
            backlog_queue_dir: "./spool/backlog".to_string(),
            object_store_root: "./objects".to_string(),
            report_bucket: runtime.report_bucket,
            report_key_prefix: runtime.report_key_prefix,
            report_schedule_enabled: runtime.report_schedule_enabled,
            report_hour: runtime.report_hour,
            report_minute: runtime.report_minute,
            report_webhook_url: None,
            report_webhook_template: None,
            lookup_batch_size: runtime.lookup_batch_size,
            store_batch_write_limit: runtime.store_batch_write_limit,
            queue_batch_size: runtime.queue_batch_size,
            visibility_timeout_seconds: runtime.visibility_timeout_seconds,
            consumer_enabled: runtime.consumer_enabled,
            consumer_poll_interval_millis: runtime.consumer_poll_interval_millis,
            max_receive_count: runtime.max_receive_count,
            max_body_bytes: runtime.max_body_bytes,
            request_timeout_seconds: runtime.request_timeout_seconds,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("RECONCILER_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        Self::load_from(Path::new(&path)).await
    }

    pub async fn load_from(file_path: &Path) -> Result<Self> {
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            Self::from_toml_str(&content)?
        } else {
            warn!(path = %file_path.display(), "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        if config.helix_access_token.is_none() && config.helix_client_secret.is_none() {
            warn!("no identity directory credentials configured, lookups will fail");
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| anyhow!("invalid config: {}", err))
    }

    pub fn normalize(&mut self) {
        for value in [
            &mut self.api_token,
            &mut self.log_dir,
            &mut self.clickhouse_user,
            &mut self.clickhouse_password,
            &mut self.helix_client_secret,
            &mut self.helix_access_token,
            &mut self.report_webhook_url,
            &mut self.report_webhook_template,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
        self.helix_client_id = self.helix_client_id.trim().to_string();
        self.helix_base_url = self.helix_base_url.trim_end_matches('/').to_string();
        self.report_key_prefix = self.report_key_prefix.trim_matches('/').to_string();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.event_queue_dir = resolve_path(base, &self.event_queue_dir);
        self.backlog_queue_dir = resolve_path(base, &self.backlog_queue_dir);
        self.object_store_root = resolve_path(base, &self.object_store_root);
        if let Some(log_dir) = &self.log_dir {
            self.log_dir = Some(resolve_path(base, log_dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.report_hour > 23 || self.report_minute > 59 {
            return Err(anyhow!("report_hour or report_minute out of range"));
        }
        if self.visibility_timeout_seconds == 0 {
            return Err(anyhow!("visibility_timeout_seconds must be greater than 0"));
        }
        validate_range("lookup_batch_size", self.lookup_batch_size, 1, MAX_LOOKUP_BATCH)?;
        validate_range(
            "store_batch_write_limit",
            self.store_batch_write_limit,
            1,
            MAX_STORE_BATCH_WRITE,
        )?;
        validate_range("queue_batch_size", self.queue_batch_size, 1, MAX_QUEUE_BATCH)?;
        validate_range(
            "max_receive_count",
            self.max_receive_count as usize,
            1,
            MAX_RECEIVE_COUNT,
        )?;
        if self.consumer_poll_interval_millis == 0 {
            return Err(anyhow!("consumer_poll_interval_millis must be greater than 0"));
        }
        validate_bucket_name(&self.report_bucket)?;
        validate_key_prefix(&self.report_key_prefix)?;
        for (name, dir) in [
            ("event_queue_dir", &self.event_queue_dir),
            ("backlog_queue_dir", &self.backlog_queue_dir),
            ("object_store_root", &self.object_store_root),
        ] {
            if dir.trim().is_empty() {
                return Err(anyhow!("{} must not be empty", name));
            }
        }
        if self.event_queue_dir == self.backlog_queue_dir {
            return Err(anyhow!("event and backlog queues must use different directories"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
            lookup_batch_size: self.lookup_batch_size,
            store_batch_write_limit: self.store_batch_write_limit,
            queue_batch_size: self.queue_batch_size,
            visibility_timeout_seconds: self.visibility_timeout_seconds,
            consumer_enabled: self.consumer_enabled,
            consumer_poll_interval_millis: self.consumer_poll_interval_millis,
            max_receive_count: self.max_receive_count,
            report_bucket: self.report_bucket.clone(),
            report_key_prefix: self.report_key_prefix.clone(),
            report_schedule_enabled: self.report_schedule_enabled,
            report_hour: self.report_hour,
            report_minute: self.report_minute,
            report_webhook_url: self.report_webhook_url.clone(),
            report_webhook_template: self.report_webhook_template.clone(),
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            clickhouse_url: self.clickhouse_url.clone(),
            clickhouse_database: self.clickhouse_database.clone(),
            clickhouse_user: self.clickhouse_user.clone(),
            clickhouse_password: self.clickhouse_password.clone(),
        }
    }

    pub fn to_identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            helix_base_url: self.helix_base_url.clone(),
            token_url: self.helix_token_url.clone(),
            client_id: self.helix_client_id.clone(),
            client_secret: self.helix_client_secret.clone(),
            access_token: self.helix_access_token.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_spool_config(&self) -> SpoolConfig {
        SpoolConfig {
            event_queue_dir: self.event_queue_dir.clone(),
            backlog_queue_dir: self.backlog_queue_dir.clone(),
            object_store_root: self.object_store_root.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("RECONCILER_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("RECONCILER_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_LOG_DIR") {
            self.log_dir = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_CLICKHOUSE_URL") {
            self.clickhouse_url = value;
        }
        if let Ok(value) = env::var("RECONCILER_CLICKHOUSE_DATABASE") {
            self.clickhouse_database = value;
        }
        if let Ok(value) = env::var("RECONCILER_CLICKHOUSE_USER") {
            self.clickhouse_user = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_CLICKHOUSE_PASSWORD") {
            self.clickhouse_password = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_HELIX_BASE_URL") {
            self.helix_base_url = value;
        }
        if let Ok(value) = env::var("RECONCILER_HELIX_TOKEN_URL") {
            self.helix_token_url = value;
        }
        if let Ok(value) = env::var("RECONCILER_HELIX_CLIENT_ID") {
            self.helix_client_id = value;
        }
        if let Ok(value) = env::var("RECONCILER_HELIX_CLIENT_SECRET") {
            self.helix_client_secret = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_HELIX_ACCESS_TOKEN") {
            self.helix_access_token = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_EVENT_QUEUE_DIR") {
            self.event_queue_dir = value;
        }
        if let Ok(value) = env::var("RECONCILER_BACKLOG_QUEUE_DIR") {
            self.backlog_queue_dir = value;
        }
        if let Ok(value) = env::var("RECONCILER_OBJECT_STORE_ROOT") {
            self.object_store_root = value;
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_BUCKET") {
            self.report_bucket = value;
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_KEY_PREFIX") {
            self.report_key_prefix = value;
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_SCHEDULE_ENABLED") {
            self.report_schedule_enabled = value.parse().unwrap_or(self.report_schedule_enabled);
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_HOUR") {
            self.report_hour = value.parse().unwrap_or(self.report_hour);
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_MINUTE") {
            self.report_minute = value.parse().unwrap_or(self.report_minute);
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_WEBHOOK_URL") {
            self.report_webhook_url = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_REPORT_WEBHOOK_TEMPLATE") {
            self.report_webhook_template = Some(value);
        }
        if let Ok(value) = env::var("RECONCILER_LOOKUP_BATCH_SIZE") {
            self.lookup_batch_size = value.parse().unwrap_or(self.lookup_batch_size);
        }
        if let Ok(value) = env::var("RECONCILER_STORE_BATCH_WRITE_LIMIT") {
            self.store_batch_write_limit = value.parse().unwrap_or(self.store_batch_write_limit);
        }
        if let Ok(value) = env::var("RECONCILER_QUEUE_BATCH_SIZE") {
            self.queue_batch_size = value.parse().unwrap_or(self.queue_batch_size);
        }
        if let Ok(value) = env::var("RECONCILER_VISIBILITY_TIMEOUT_SECONDS") {
            self.visibility_timeout_seconds =
                value.parse().unwrap_or(self.visibility_timeout_seconds);
        }
        if let Ok(value) = env::var("RECONCILER_CONSUMER_ENABLED") {
            self.consumer_enabled = value.parse().unwrap_or(self.consumer_enabled);
        }
        if let Ok(value) = env::var("RECONCILER_CONSUMER_POLL_INTERVAL_MILLIS") {
            self.consumer_poll_interval_millis =
                value.parse().unwrap_or(self.consumer_poll_interval_millis);
        }
        if let Ok(value) = env::var("RECONCILER_MAX_RECEIVE_COUNT") {
            self.max_receive_count = value.parse().unwrap_or(self.max_receive_count);
        }
        if let Ok(value) = env::var("RECONCILER_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("RECONCILER_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
