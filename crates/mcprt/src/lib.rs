//! # mcprt - Model Context Protocol runtime core
//!
//! This crate is a facade over the workspace: the pluggable transports
//! (`mcprt-tcp`, `mcprt-stdio`, `mcprt-websocket`, `mcprt-streamable-http`),
//! the JSON-RPC dispatcher and handler registry (`mcprt-server`), the LRU
//! resource cache (`mcprt-cache`), the object/buffer pools (`mcprt-pool`),
//! and the advanced rate limiter (`mcprt-ratelimit`), wired together behind
//! one [`McpServer`].
//!
//! A host registers resources, resource templates, and tools against an
//! [`McpServerBuilder`], attaches one or more server transports, and calls
//! [`McpServer::start`]. Every attached transport feeds inbound bytes
//! through the same shared [`Dispatcher`]; replies flow back out on
//! whichever transport (and, for Streamable HTTP, whichever connection)
//! the request arrived on.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mcprt::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = McpServer::builder()
//!         .register_tool(
//!             Tool::new("echo"),
//!             Arc::new(|args: &serde_json::Value| {
//!                 let args = args.clone();
//!                 async move { Ok(args) }
//!             }),
//!         )
//!         .with_transport("stdio", Arc::new(mcprt_stdio::StdioTransport::new()))
//!         .build();
//!
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod server;

pub use server::{McpServer, McpServerBuilder};

/// Re-exports of the types most hosts need, mirroring the teacher's
/// `prelude` module: the data model, the dispatcher and registry, and the
/// handler trait objects a host implements against.
pub mod prelude {
    pub use mcprt_cache::config::Ttl;
    pub use mcprt_protocol::{
        codes, ContentItem, ErrorKind, McpError, Message, MessageId, Resource, ResourceTemplate,
        Tool, ToolInputField,
    };
    pub use mcprt_server::{
        AuthContext, Credential, CredentialVerifier, Dispatcher, DispatcherConfig,
        RequestMeta, ResourceHandler, SharedResourceHandler, SharedToolHandler, ToolHandler,
    };
    pub use mcprt_transport::{
        ClientTransport, ErrorCallback, MessageCallback, ServerTransport, TransportCapabilities,
        TransportError, TransportResult, TransportState, TransportType,
    };

    pub use crate::{McpServer, McpServerBuilder};
}

pub use mcprt_cache as cache;
pub use mcprt_pool as pool;
pub use mcprt_protocol as protocol;
pub use mcprt_ratelimit as ratelimit;
pub use mcprt_server as server_core;
pub use mcprt_stdio as stdio;
pub use mcprt_streamable_http as streamable_http;
pub use mcprt_tcp as tcp;
pub use mcprt_transport as transport;
pub use mcprt_websocket as websocket;
