//! Transport-level errors (spec §7): every transport returns an integer/enum
//! status rather than throwing, matching `turbomcp-transport-traits::error`.

use thiserror::Error;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("framing violation: {0}")]
    Framing(String),

    #[error("message exceeds maximum size ({size} > {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("operation timed out")]
    Timeout,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport is shutting down")]
    ShuttingDown,

    #[error("transport not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<TransportError> for mcprt_protocol::McpError {
    fn from(err: TransportError) -> Self {
        use mcprt_protocol::ErrorKind;
        mcprt_protocol::McpError::new(ErrorKind::Transport, err.to_string())
    }
}
