use std::sync::Arc;

use reconciler_domain::ports::{
    AccountRepository, HealthCheckService, IdentityDirectory, MessageQueue, ObjectStore,
    RegistrationRepository, ReportNotifier, TicketRepository,
};
use reconciler_domain::RuntimeConfig;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub identity_directory: Arc<dyn IdentityDirectory>,
    pub account_repo: Arc<dyn AccountRepository>,
    pub registration_repo: Arc<dyn RegistrationRepository>,
    pub ticket_repo: Arc<dyn TicketRepository>,
    pub event_queue: Arc<dyn MessageQueue>,
    pub backlog_queue: Arc<dyn MessageQueue>,
    pub object_store: Arc<dyn ObjectStore>,
    pub report_notifier: Arc<dyn ReportNotifier>,
    pub health_service: Arc<dyn HealthCheckService>,
    pub metrics: Arc<Metrics>,
}
