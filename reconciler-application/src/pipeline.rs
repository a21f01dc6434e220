// Reconciliation pipeline stages shared by the stream and queue commands

pub mod resolver;
pub mod tracker;
pub mod writer;

pub use resolver::*;
pub use tracker::*;
pub use writer::*;
