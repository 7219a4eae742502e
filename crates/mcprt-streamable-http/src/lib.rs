//! Streamable-HTTP transport (spec §4.2): one configurable endpoint
//! (default `/mcp`) accepting `POST`/`GET`/`DELETE`/`OPTIONS`, backed by a
//! session manager (§4.4) and an SSE event store for `Last-Event-ID`
//! resumability (§4.5).
//!
//! [`router`] wires those pieces into an [`mcprt_transport::ServerTransport`]
//! on top of `axum`; the other modules are pure, I/O-free building blocks
//! usable independently (session bookkeeping, SSE framing, event replay).

pub mod config;
pub mod event_store;
pub mod router;
pub mod session;
pub mod sse;
pub mod types;

pub use config::StreamableConfig;
pub use event_store::EventStore;
pub use router::StreamableHttpServerTransport;
pub use session::{Session, SessionManager};
pub use sse::{SseEncoder, SseEvent, SseEventBuilder, SseParser};
pub use types::{OriginValidation, StreamableError};

/// Header names used by the Streamable HTTP transport.
pub mod headers {
    /// Session ID header for tracking stateful connections.
    pub const MCP_SESSION_ID: &str = "Mcp-Session-Id";

    /// Last event ID header for SSE resumption.
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";

    /// Content-Type for JSON responses.
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Content-Type for SSE streams.
    pub const CONTENT_TYPE_SSE: &str = "text/event-stream";

    /// Accept header value for SSE.
    pub const ACCEPT_SSE: &str = "text/event-stream";
}
