//! Shared JSON-RPC message types and MCP data model.
//!
//! This crate is the source of truth for the wire-level [`Message`] enum,
//! the [`Resource`]/[`ResourceTemplate`]/[`Tool`]/[`ContentItem`] data model,
//! and the JSON-RPC error code constants used by every transport and by the
//! dispatcher.

pub mod content;
pub mod error;
pub mod message;
pub mod resource;
pub mod tool;

pub use content::ContentItem;
pub use error::{JsonRpcError, McpError, codes};
pub use message::{Message, MessageId};
pub use resource::{Resource, ResourceTemplate};
pub use tool::{Tool, ToolInputField};

/// Maximum size, in bytes, of a single JSON-RPC message accepted by any
/// transport in this workspace. Transports validate against this before
/// attempting to parse a payload.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
