/// Error type shared by the whole simulator.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("failed to allocate thread state for {threads} threads")]
    AllocationFailed { threads: usize },

    #[error("run already finalized")]
    RunFinalized,

    #[error("thread {tid} out of range (run has {threads} threads)")]
    ThreadOutOfRange { tid: usize, threads: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Json(err.to_string())
    }
}
