//! Error types for ncdknn

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Worker spawn error: {0}")]
    WorkerSpawn(String),

    #[error("Worker lost: {0}")]
    WorkerLost(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid distance: {0}")]
    InvalidDistance(String),

    #[error("Invalid sample at line {line}: {reason}")]
    InvalidSample { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn compression(msg: impl Into<String>) -> Self {
        Error::Compression(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Configuration and resource faults. These are never retried; callers
    /// are expected to abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Compression(_)
                | Error::WorkerSpawn(_)
                | Error::WorkerLost(_)
                | Error::InvalidConfig(_)
        )
    }
}
