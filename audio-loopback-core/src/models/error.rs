use thiserror::Error;

/// Errors that can occur while configuring or running a loopback session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoopbackError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("session not initialized")]
    NotInitialized,

    #[error("transient I/O error: {0}")]
    TransientIo(String),

    #[error("teardown failed: {0}")]
    Teardown(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Result alias used throughout the loopback crates.
pub type LoopbackResult<T> = Result<T, LoopbackError>;
