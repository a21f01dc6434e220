pub mod consume_commands;
pub mod dlq_report_commands;
pub mod forward_commands;
pub mod import_commands;
pub mod queue_commands;
pub mod reconcile_commands;

pub use consume_commands::*;
pub use dlq_report_commands::*;
pub use forward_commands::*;
pub use import_commands::*;
pub use queue_commands::*;
pub use reconcile_commands::*;
