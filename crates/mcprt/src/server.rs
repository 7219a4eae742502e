//! [`McpServer`]: wires one shared [`Dispatcher`] to every attached
//! transport, matching the "Dataflow" described in spec §2 — bytes arrive
//! at a transport, are framed into one JSON-RPC message, and handed to a
//! `message_cb` that the dispatcher supplies here.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use mcprt_cache::cache::ResourceCache;
use mcprt_cache::config::Ttl;
use mcprt_protocol::{ContentItem, Resource, ResourceTemplate, Tool};
use mcprt_ratelimit::RateLimiter;
use mcprt_server::{
    CredentialVerifier, Dispatcher, DispatcherConfig, RequestMeta, SharedResourceHandler,
    SharedToolHandler,
};
use mcprt_transport::{ErrorCallback, MessageCallback, ServerTransport, TransportResult};
use tracing::warn;

/// Builds an [`McpServer`]: register resources/templates/tools, attach
/// transports, and configure the shared dispatcher's cross-cutting
/// concerns (auth, rate limiting, caching) before calling [`Self::build`].
pub struct McpServerBuilder {
    dispatcher: Dispatcher,
    transports: Vec<(String, Arc<dyn ServerTransport>)>,
}

impl std::fmt::Debug for McpServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerBuilder")
            .field("transports", &self.transports.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl McpServerBuilder {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            transports: Vec::new(),
        }
    }

    /// Supply a credential verifier (spec §4.9 step 2). Defaults to
    /// accepting every request as an anonymous principal.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.dispatcher = self.dispatcher.with_verifier(verifier);
        self
    }

    /// Attach the advanced rate limiter (spec §4.10). Absent, no request is
    /// ever rate-limited.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.dispatcher = self.dispatcher.with_rate_limiter(limiter);
        self
    }

    /// Attach the resource cache (spec §4.6). Absent, cacheable resources
    /// are still served correctly, just never cached.
    pub fn with_cache(mut self, cache: ResourceCache) -> Self {
        self.dispatcher = self.dispatcher.with_cache(cache);
        self
    }

    /// Register a static resource (spec §3 `Resource`).
    pub fn register_resource(
        self,
        resource: Resource,
        handler: SharedResourceHandler,
        cacheable: bool,
        ttl: Ttl,
    ) -> Self {
        self.dispatcher
            .registry()
            .register_resource(resource, handler, cacheable, ttl);
        self
    }

    /// Register a parameterised resource template (spec §3
    /// `ResourceTemplate`); the first template whose pattern matches an
    /// unresolved URI, in registration order, serves it (spec §4.9 step 5).
    pub fn register_resource_template(
        self,
        template: ResourceTemplate,
        handler: SharedResourceHandler,
        cacheable: bool,
        ttl: Ttl,
    ) -> Self {
        self.dispatcher
            .registry()
            .register_resource_template(template, handler, cacheable, ttl);
        self
    }

    /// Register the handler consulted when no static resource or template
    /// matches a `read_resource` URI, before falling back to -32101.
    pub fn set_fallback_resource_handler(self, handler: SharedResourceHandler) -> Self {
        self.dispatcher.registry().set_fallback_resource_handler(handler);
        self
    }

    /// Register a callable tool (spec §3 `Tool`).
    pub fn register_tool(self, tool: Tool, handler: SharedToolHandler) -> Self {
        self.dispatcher.registry().register_tool(tool, handler);
        self
    }

    /// Attach a server transport under a name used only for diagnostics
    /// (log lines, [`McpServer::transport_names`]) — it has no bearing on
    /// routing, since every transport feeds the same dispatcher.
    pub fn with_transport(mut self, name: impl Into<String>, transport: Arc<dyn ServerTransport>) -> Self {
        self.transports.push((name.into(), transport));
        self
    }

    pub fn build(self) -> Arc<McpServer> {
        Arc::new(McpServer {
            dispatcher: Arc::new(self.dispatcher),
            transports: self.transports,
        })
    }
}

/// A dispatcher plus every transport it was built to serve. Starting the
/// server starts every transport concurrently, each wired to the same
/// dispatcher instance; stopping it drains the dispatcher (spec §4.9
/// "Graceful shutdown") before tearing transports down.
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    transports: Vec<(String, Arc<dyn ServerTransport>)>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("transports", &self.transport_names())
            .finish()
    }
}

impl McpServer {
    pub fn builder() -> McpServerBuilder {
        McpServerBuilder::new()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn transport_names(&self) -> Vec<&str> {
        self.transports.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn transport(&self, name: &str) -> Option<&Arc<dyn ServerTransport>> {
        self.transports.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Start every attached transport, each wired to the shared dispatcher
    /// via a `message_cb` that parses, authenticates, rate-limits, routes,
    /// and serializes a reply (spec §4.9). Per-request metadata (the
    /// fields a rate-limit key or credential would be drawn from) is not
    /// threaded through `message_cb`'s uniform `(bytes) -> reply` shape
    /// (spec §4.1); a host needing per-connection identity calls
    /// [`Self::dispatcher`] directly from within its own transport instead
    /// of going through this convenience wiring.
    pub async fn start(&self) -> TransportResult<()> {
        for (name, transport) in &self.transports {
            let dispatcher = self.dispatcher.clone();
            let message_cb: MessageCallback = Arc::new(move |bytes: Bytes| {
                let dispatcher = dispatcher.clone();
                Box::pin(async move {
                    let meta = RequestMeta::default();
                    let reply = dispatcher.handle_message(&bytes, &meta).await;
                    Ok(reply.map(Bytes::from))
                })
            });
            let transport_name = name.clone();
            let error_cb: ErrorCallback = Arc::new(move |err| {
                warn!(transport = %transport_name, error = %err, "transport-level error");
            });
            transport.start(message_cb, error_cb).await?;
        }
        Ok(())
    }

    /// Initiate graceful shutdown (spec §4.9): stop the dispatcher from
    /// accepting new semantics and wait for in-flight requests to drain,
    /// then stop every transport.
    pub async fn stop(&self) -> TransportResult<()> {
        if let Err(e) = self.dispatcher.stop().await {
            warn!(error = %e, "dispatcher did not drain cleanly before transport shutdown");
        }
        for (name, transport) in &self.transports {
            if let Err(e) = transport.stop().await {
                warn!(transport = %name, error = %e, "transport failed to stop cleanly");
            }
        }
        Ok(())
    }

    /// Snapshot of every attached transport's metrics, keyed by the name
    /// it was registered under.
    pub async fn transport_metrics(&self) -> HashMap<String, mcprt_transport::TransportMetrics> {
        let mut out = HashMap::new();
        for (name, transport) in &self.transports {
            out.insert(name.clone(), transport.metrics().await);
        }
        out
    }
}

/// Convenience constructor for a text [`ContentItem`], re-exported at the
/// crate root for hosts wiring up a `ResourceHandler` inline.
pub fn text_content(mime_type: impl Into<String>, data: impl Into<String>) -> ContentItem {
    ContentItem::text(mime_type, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_protocol::Message;
    use mcprt_transport::TransportState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn ping_round_trips_through_a_stdio_transport() {
        let (client_tx, server_rx) = tokio::io::duplex(4096);
        let (server_tx, mut client_rx) = tokio::io::duplex(4096);
        let transport = Arc::new(mcprt_stdio::StdioTransport::from_raw(server_rx, server_tx));

        let server = McpServer::builder()
            .with_transport("stdio", transport.clone())
            .build();
        server.start().await.unwrap();
        assert_eq!(transport.state().await, TransportState::Connected);

        let mut writer = client_tx;
        tokio::io::AsyncWriteExt::write_all(
            &mut writer,
            br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        )
        .await
        .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"\n").await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = tokio::io::AsyncReadExt::read(&mut client_rx, &mut buf).await.unwrap();
        let line = std::str::from_utf8(&buf[..n]).unwrap().trim_end();
        let reply = Message::from_json(line.as_bytes()).unwrap();
        assert_eq!(
            reply,
            Message::success(mcprt_protocol::MessageId(1), serde_json::json!({"pong": true}))
        );

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn resource_cache_hit_skips_handler_through_the_facade() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: SharedResourceHandler = Arc::new(move |_uri: &str| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(vec![text_content("text/plain", "hi")])
            }
        });

        let server = McpServer::builder()
            .with_cache(ResourceCache::new(mcprt_cache::config::CacheConfig::default()))
            .register_resource(Resource::new("mem://x"), handler, true, Ttl::Default)
            .build();

        let meta = RequestMeta::default();
        let msg = Message::request(1u64, "read_resource", serde_json::json!({"uri": "mem://x"})).to_bytes();
        server.dispatcher().handle_message(&msg, &meta).await.unwrap();
        server.dispatcher().handle_message(&msg, &meta).await.unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn tool_call_round_trips_through_the_registry() {
        let tool = Tool::new("echo");
        let handler: SharedToolHandler = Arc::new(|args: &serde_json::Value| {
            let args = args.clone();
            async move { Ok(args) }
        });
        let server = McpServer::builder().register_tool(tool, handler).build();

        let meta = RequestMeta::default();
        let msg = Message::request(
            1u64,
            "call_tool",
            serde_json::json!({"name": "echo", "arguments": {"x": 1}}),
        )
        .to_bytes();
        let reply = server.dispatcher().handle_message(&msg, &meta).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        assert_eq!(
            parsed,
            Message::success(mcprt_protocol::MessageId(1), serde_json::json!({"x": 1}))
        );
    }

    #[tokio::test]
    async fn transport_names_reports_every_attached_transport() {
        let server = McpServer::builder()
            .with_transport("stdio", Arc::new(mcprt_stdio::StdioTransport::new()))
            .build();
        assert_eq!(server.transport_names(), vec!["stdio"]);
        assert!(server.transport("stdio").is_some());
        assert!(server.transport("tcp").is_none());
    }
}
