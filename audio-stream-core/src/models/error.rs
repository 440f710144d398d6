use thiserror::Error;

/// Errors surfaced by track construction and the transport/device seams.
///
/// Steady-state streaming never produces these: the receive callback path
/// logs and skips instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("dispatcher error: {0}")]
    Dispatcher(String),
}

pub type Result<T> = std::result::Result<T, StreamError>;
