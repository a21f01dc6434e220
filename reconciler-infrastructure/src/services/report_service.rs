use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use reqwest::Client;
use tracing::{error, info, warn};

use reconciler_application::commands::generate_dlq_report;
use reconciler_application::AppState;
use reconciler_domain::{DlqReportResult, ReportNotifier, RuntimeConfig};

const DEFAULT_TEMPLATE: &str =
    r#"{"message":"Dead-letter report: {entries} entries uploaded to {bucket}/{key}"}"#;

pub async fn schedule_dlq_reports(state: AppState) {
    if !state.config.report_schedule_enabled {
        info!("scheduled dead-letter reports disabled");
        return;
    }

    loop {
        let now = Local::now();
        let Some(next) = next_report_time(&state.config, now) else {
            // local time has no such instant today (DST gap)
            warn!("could not compute next report time, retrying in an hour");
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };
        let sleep_ms = next.signed_duration_since(now).num_milliseconds().max(0) as u64;
        info!(next = %next, "next dead-letter report scheduled");
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;

        match generate_dlq_report(&state).await {
            Ok(result) => info!(
                entries = result.entries_reported,
                key = %result.object_key,
                "scheduled dead-letter report complete"
            ),
            Err(err) => error!("scheduled dead-letter report failed: {}", err),
        }
    }
}

pub fn next_report_time(config: &RuntimeConfig, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let today = now.date_naive();
    let candidate = local_report_time(today, config)?;
    if candidate > now {
        return Some(candidate);
    }
    local_report_time(today.succ_opt()?, config)
}

fn local_report_time(date: NaiveDate, config: &RuntimeConfig) -> Option<DateTime<Local>> {
    let naive = date.and_hms_opt(config.report_hour, config.report_minute, 0)?;
    Local.from_local_datetime(&naive).earliest()
}

pub fn render_notification(template: Option<&str>, result: &DlqReportResult) -> String {
    template
        .unwrap_or(DEFAULT_TEMPLATE)
        .replace("{entries}", &result.entries_reported.to_string())
        .replace("{bucket}", &result.bucket_name)
        .replace("{key}", &result.object_key)
}

/// Posts a JSON notice after each uploaded report; a no-op without a URL.
pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
    template: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self {
            client,
            url: config.report_webhook_url.clone(),
            template: config.report_webhook_template.clone(),
        })
    }
}

#[async_trait]
impl ReportNotifier for WebhookNotifier {
    async fn notify_report(&self, result: &DlqReportResult) -> Result<()> {
        let Some(url) = &self.url else {
            return Ok(());
        };
        let payload = render_notification(self.template.as_deref(), result);
        self.client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
