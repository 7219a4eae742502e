//! The server/client transport contract (spec §4.1), as a `dyn`-safe async
//! trait pair rather than the original's vtable-of-function-pointers (see
//! `SPEC_FULL.md` §9 Design Notes: "Dynamic dispatch of transports").

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportResult;
use crate::types::{TransportCapabilities, TransportState, TransportType};
use crate::TransportMetrics;

/// `message_cb(bytes) -> reply_bytes | None`. Returning `Some` means "send
/// this back on the originating connection" (spec §4.1); the shape of "the
/// originating connection" is transport-specific and threaded through via
/// the transport's own per-connection bookkeeping, not this callback's
/// signature.
pub type MessageCallback = Arc<
    dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = TransportResult<Option<Bytes>>> + Send>>
        + Send
        + Sync,
>;

/// Invoked when a transport-level error occurs on a connection that isn't
/// otherwise surfaced as a `TransportResult` (e.g. a background accept-loop
/// failure). Never called for expected per-request errors, which flow back
/// through `MessageCallback`'s `Err` instead.
pub type ErrorCallback = Arc<dyn Fn(crate::error::TransportError) + Send + Sync>;

/// A transport that accepts many peers. `send` is not part of this trait at
/// the interface level (spec §4.1): replies are produced synchronously by
/// `message_cb` returning bytes, threaded back to the connection the
/// request arrived on.
#[async_trait]
pub trait ServerTransport: Send + Sync + std::fmt::Debug {
    fn transport_type(&self) -> TransportType;

    fn capabilities(&self) -> TransportCapabilities;

    async fn state(&self) -> TransportState;

    /// Begin accepting connections and dispatching inbound messages to
    /// `message_cb`. Returns once the accept loop is spawned, not once it
    /// exits.
    async fn start(
        &self,
        message_cb: MessageCallback,
        error_cb: ErrorCallback,
    ) -> TransportResult<()>;

    /// Stop accepting new connections and drain in-flight work (spec §4.9
    /// Graceful shutdown). Idempotent.
    async fn stop(&self) -> TransportResult<()>;

    async fn metrics(&self) -> TransportMetrics;

    fn endpoint(&self) -> Option<String> {
        None
    }

    /// Release all resources. Default delegates to `stop`; a transport
    /// with additional teardown (e.g. closing a listener socket handle)
    /// overrides this.
    async fn destroy(&self) -> TransportResult<()> {
        self.stop().await
    }
}

/// A transport with a single remote peer: `send`/`receive` used directly by
/// the host (spec §4.1), plus the client-only `receive(timeout)` the
/// server side never needs. Used by the dispatcher's outbound connection
/// pool (spec §4.8) as the pooled resource type.
#[async_trait]
pub trait ClientTransport: Send + Sync + std::fmt::Debug {
    fn transport_type(&self) -> TransportType;

    fn capabilities(&self) -> TransportCapabilities;

    async fn state(&self) -> TransportState;

    async fn connect(&self) -> TransportResult<()>;

    async fn disconnect(&self) -> TransportResult<()>;

    async fn send(&self, payload: Bytes) -> TransportResult<()>;

    /// Vectored send: groups `parts` into one framed write where the
    /// underlying transport supports it (spec §4.3 "groups length prefix +
    /// body in one syscall"); the default concatenates and calls `send`.
    async fn sendv(&self, parts: &[Bytes]) -> TransportResult<()> {
        let mut joined = Vec::with_capacity(parts.iter().map(Bytes::len).sum());
        for part in parts {
            joined.extend_from_slice(part);
        }
        self.send(Bytes::from(joined)).await
    }

    async fn receive(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> TransportResult<Option<Bytes>>;

    async fn metrics(&self) -> TransportMetrics;

    async fn destroy(&self) -> TransportResult<()> {
        self.disconnect().await
    }
}
