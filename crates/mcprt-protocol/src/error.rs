//! JSON-RPC error code constants (spec §6) and a small `McpError` used by
//! every other crate to convert its own error enum into a wire-level
//! [`RpcError`](crate::message::RpcError).

use crate::message::{MessageId, RpcError};
use thiserror::Error;

/// JSON-RPC 2.0 standard codes plus the MCP-specific extensions from spec §6.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const TRANSPORT_ERROR: i32 = -32100;
    pub const RESOURCE_NOT_FOUND: i32 = -32101;
    pub const TOOL_NOT_FOUND: i32 = -32102;
    pub const FORBIDDEN: i32 = -32103;

    /// Application-defined server errors, reserved range `-32000..=-32099`.
    /// Rate-limit denials use the first slot in this range.
    pub const RATE_LIMITED: i32 = -32000;
}

/// A structured, kind-tagged error any component can raise; converts
/// cleanly to a wire [`RpcError`] so the dispatcher never has to guess a
/// code from a string message.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct McpError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    Internal,
    Transport,
    ResourceNotFound,
    ToolNotFound,
    Forbidden,
    RateLimited,
}

impl McpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        match self.kind {
            ErrorKind::Parse => codes::PARSE_ERROR,
            ErrorKind::InvalidRequest => codes::INVALID_REQUEST,
            ErrorKind::MethodNotFound => codes::METHOD_NOT_FOUND,
            ErrorKind::InvalidParams => codes::INVALID_PARAMS,
            ErrorKind::Internal => codes::INTERNAL_ERROR,
            ErrorKind::Transport => codes::TRANSPORT_ERROR,
            ErrorKind::ResourceNotFound => codes::RESOURCE_NOT_FOUND,
            ErrorKind::ToolNotFound => codes::TOOL_NOT_FOUND,
            ErrorKind::Forbidden => codes::FORBIDDEN,
            ErrorKind::RateLimited => codes::RATE_LIMITED,
        }
    }

    pub fn into_rpc_error(self) -> RpcError {
        RpcError::new(self.code(), self.message)
    }
}

/// Build a JSON-RPC error [`crate::Message::Response`] for a message that
/// could not be routed at all: malformed JSON, protocol violations, or any
/// dispatcher-level failure with a recoverable id.
pub struct JsonRpcError;

impl JsonRpcError {
    pub fn response(id: MessageId, err: McpError) -> crate::Message {
        crate::Message::failure(id, err.into_rpc_error())
    }
}
