use mcprt_protocol::{ErrorKind, McpError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("shutdown deadline elapsed with {0} request(s) still in flight")]
    ShutdownTimedOut(usize),
}

impl From<DispatchError> for McpError {
    fn from(err: DispatchError) -> Self {
        McpError::new(ErrorKind::Internal, err.to_string())
    }
}
