pub mod consumer_service;
pub mod fs_object_store;
pub mod health_service;
pub mod helix_directory;
pub mod report_service;
pub mod spool_queue;

pub use consumer_service::*;
pub use fs_object_store::*;
pub use health_service::*;
pub use helix_directory::*;
pub use report_service::*;
pub use spool_queue::*;
