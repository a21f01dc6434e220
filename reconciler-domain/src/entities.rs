// Domain entities

pub mod account;
pub mod change_record;
pub mod config;
pub mod dead_letter;
pub mod failure;
pub mod queue;
pub mod registration;
pub mod store;
pub mod ticket;
pub mod ticket_event;

pub use account::*;
pub use change_record::*;
pub use config::*;
pub use dead_letter::*;
pub use failure::*;
pub use queue::*;
pub use registration::*;
pub use store::*;
pub use ticket::*;
pub use ticket_event::*;
