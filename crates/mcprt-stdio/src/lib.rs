//! Line-delimited JSON stdio transport (spec §4.1, §6 "Stdio wire"): one
//! JSON-RPC message per line, `\n`-terminated, `\r?\n` tolerated, no embedded
//! newlines.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcprt_stdio::StdioTransport;
//! use mcprt_transport::ServerTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = StdioTransport::new();
//!     transport.start(message_cb, error_cb).await.unwrap();
//! }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod transport;

pub use transport::{StdioServerTransportFactory, StdioTransport};
