// Domain services (pure, no I/O)

pub mod classifier;
pub mod normalizer;
pub mod roster;

pub use classifier::*;
pub use normalizer::*;
pub use roster::*;
