//! Cache-local error type, convertible into [`mcprt_protocol::McpError`].

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache entry for key `{0}` holds no content")]
    EmptyContent(String),
}

impl From<CacheError> for mcprt_protocol::McpError {
    fn from(err: CacheError) -> Self {
        mcprt_protocol::McpError::new(mcprt_protocol::ErrorKind::Internal, err.to_string())
    }
}
