// Domain value objects
pub mod failure_code;
pub mod failure_reason;
pub mod identifiers;
pub mod login;

pub use failure_code::*;
pub use failure_reason::*;
pub use identifiers::*;
pub use login::*;
