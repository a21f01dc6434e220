pub mod dlq_handlers;
pub mod import_handlers;
pub mod ops_handlers;
pub mod queue_handlers;
pub mod stream_handlers;

pub use dlq_handlers::*;
pub use import_handlers::*;
pub use ops_handlers::*;
pub use queue_handlers::*;
pub use stream_handlers::*;
