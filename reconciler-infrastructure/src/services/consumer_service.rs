use std::time::Duration;

use tracing::{error, info};

use reconciler_application::commands::{consume_event_queue, ConsumeReport};
use reconciler_application::AppState;
use reconciler_domain::RuntimeConfig;

/// Polls the event queue until the process exits.
pub async fn run_event_consumer(state: AppState) {
    if !state.config.consumer_enabled {
        info!("event queue consumer disabled");
        return;
    }
    info!(
        max_receive_count = state.config.max_receive_count,
        "event queue consumer started"
    );

    loop {
        let delay = match consume_event_queue(&state).await {
            Ok(report) => poll_delay(&state.config, &report),
            Err(err) => {
                error!("event queue consume failed: {}", err);
                Some(idle_interval(&state.config))
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// A full batch means more is probably waiting, so the next receive starts at once.
pub fn poll_delay(config: &RuntimeConfig, report: &ConsumeReport) -> Option<Duration> {
    if report.received >= config.queue_batch_size.clamp(1, 10) {
        None
    } else {
        Some(idle_interval(config))
    }
}

fn idle_interval(config: &RuntimeConfig) -> Duration {
    Duration::from_millis(config.consumer_poll_interval_millis.max(1))
}
