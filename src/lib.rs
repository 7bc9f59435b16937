pub mod config;
pub mod error;
pub mod executor;
pub mod isa;
pub mod machine;
pub mod memory;
pub mod metrics;
pub mod scheduler;
pub mod stats;
pub mod thread;

pub use error::{Result, SimError};
