//! The JSON-RPC dispatcher (spec §4.9): parse, authenticate, rate-limit,
//! route, dispatch, serialize. One `Dispatcher` is shared (via `Arc`) across
//! every transport a host registers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcprt_cache::cache::ResourceCache;
use mcprt_protocol::{codes, ContentItem, ErrorKind, McpError, Message, MessageId, Resource, Tool};
use mcprt_ratelimit::RateLimiter;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::auth::{AllowAllVerifier, Credential, CredentialVerifier};
use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::metrics::{AtomicPerformanceMetrics, PerformanceMetrics};
use crate::registry::Registry;

/// Per-request metadata a transport supplies alongside the raw bytes:
/// the fields the configured rate-limit key is composed from, plus the
/// raw credential for [`CredentialVerifier::verify`].
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user: Option<String>,
    pub api_key: Option<String>,
    pub custom: Option<String>,
    pub credential: Credential,
}

pub struct Dispatcher {
    config: DispatcherConfig,
    registry: Registry,
    verifier: Arc<dyn CredentialVerifier>,
    rate_limiter: Option<RateLimiter>,
    cache: Option<ResourceCache>,
    metrics: AtomicPerformanceMetrics,
    active_requests: AtomicUsize,
    shutting_down: AtomicBool,
    drain_notify: Notify,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            verifier: Arc::new(AllowAllVerifier),
            rate_limiter: None,
            cache: None,
            metrics: AtomicPerformanceMetrics::new(),
            active_requests: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
            drain_notify: Notify::new(),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_cache(mut self, cache: ResourceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    pub fn reset_performance_metrics(&self) {
        self.metrics.reset();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Initiate graceful shutdown: stop accepting new semantics (transports
    /// are expected to consult [`Self::is_shutting_down`] before routing
    /// more work here) and wait for in-flight requests to drain, bounded by
    /// `config.shutdown_deadline` (spec §4.9 "Graceful shutdown").
    pub async fn stop(&self) -> Result<(), DispatchError> {
        self.shutting_down.store(true, Ordering::Release);
        let deadline = self.config.shutdown_deadline;
        let start = Instant::now();

        loop {
            if self.active_requests.load(Ordering::Acquire) == 0 {
                return Ok(());
            }
            let Some(remaining) = deadline.checked_sub(start.elapsed()) else {
                let stuck = self.active_requests.load(Ordering::Acquire);
                warn!(stuck, "shutdown deadline elapsed with requests still in flight");
                return Err(DispatchError::ShutdownTimedOut(stuck));
            };
            let _ = tokio::time::timeout(remaining, self.drain_notify.notified()).await;
        }
    }

    fn key_for(&self, meta: &RequestMeta, source: crate::config::RateLimitKeySource) -> Option<String> {
        use crate::config::RateLimitKeySource as S;
        match source {
            S::Ip => meta.ip.clone(),
            S::User => meta.user.clone(),
            S::ApiKey => meta.api_key.clone(),
            S::Custom => meta.custom.clone(),
        }
    }

    /// Entry point: parse one JSON-RPC message, authenticate, rate-limit,
    /// route, dispatch, and serialize the reply (spec §4.9 steps 1-9).
    /// Returns `None` for notifications and messages that must be silently
    /// dropped; otherwise the raw reply bytes for the transport to send.
    pub async fn handle_message(&self, bytes: &[u8], meta: &RequestMeta) -> Option<Vec<u8>> {
        let start = Instant::now();
        let reply = self.handle_message_inner(bytes, meta).await;
        self.metrics.record_latency_us(start.elapsed().as_micros() as u64);
        reply
    }

    async fn handle_message_inner(&self, bytes: &[u8], meta: &RequestMeta) -> Option<Vec<u8>> {
        let message = match Message::from_json(bytes) {
            Ok(m) => m,
            Err(failure) => {
                let Some(id) = failure.recovered_id else {
                    debug!("dropping unparseable message with no recoverable id");
                    return None;
                };
                let err = McpError::new(ErrorKind::Parse, "malformed JSON-RPC message");
                self.metrics.record_request(false);
                return Some(Message::failure(id, err.into_rpc_error()).to_bytes());
            }
        };

        let (id, method, params) = match message {
            Message::Request { id, method, params } => (Some(id), method, params),
            Message::Notification { method, params } => (None, method, params),
            Message::Response { .. } => {
                debug!("dropping unsolicited response message");
                return None;
            }
        };

        if self.shutting_down.load(Ordering::Acquire) {
            let err = McpError::new(ErrorKind::Transport, "server is shutting down");
            return id.map(|id| {
                self.metrics.record_request(false);
                Message::failure(id, err.into_rpc_error()).to_bytes()
            });
        }

        self.active_requests.fetch_add(1, Ordering::AcqRel);
        let result = self.route(id, &method, params, meta).await;
        if self.active_requests.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drain_notify.notify_waiters();
        }

        match (id, result) {
            (None, _) => None,
            (Some(id), Ok(value)) => {
                self.metrics.record_request(true);
                Some(Message::success(id, value).to_bytes())
            }
            (Some(id), Err(err)) => {
                self.metrics.record_request(false);
                Some(Message::failure(id, err.into_rpc_error()).to_bytes())
            }
        }
    }

    async fn route(
        &self,
        id: Option<MessageId>,
        method: &str,
        params: Value,
        meta: &RequestMeta,
    ) -> Result<Value, McpError> {
        let _auth = self
            .verifier
            .verify(&meta.credential)
            .await
            .ok_or_else(|| McpError::new(ErrorKind::Forbidden, "credential verification failed"))?;

        if let Some(limiter) = &self.rate_limiter {
            let key_type = self.config.rate_limit_key_source.into();
            if let Some(key) = self.key_for(meta, self.config.rate_limit_key_source) {
                if !limiter.check(key_type, &key) {
                    self.metrics.record_rate_limited();
                    return Err(McpError::new(ErrorKind::RateLimited, "rate limit exceeded"));
                }
            }
        }

        match method {
            "ping" => Ok(serde_json::json!({"pong": true})),
            "list_resources" => Ok(serde_json::to_value(self.registry.list_resources()).expect("Resource serializes")),
            "list_resource_templates" => {
                Ok(serde_json::to_value(self.registry.list_resource_templates()).expect("ResourceTemplate serializes"))
            }
            "read_resource" => self.read_resource(params).await,
            "list_tools" => Ok(serde_json::to_value(self.registry.list_tools()).expect("Tool serializes")),
            "call_tool" => self.call_tool(params).await,
            "get_performance_metrics" => {
                Ok(serde_json::to_value(self.performance_metrics()).expect("PerformanceMetrics serializes"))
            }
            "reset_performance_metrics" => {
                self.reset_performance_metrics();
                Ok(Value::Null)
            }
            other => {
                let _ = id;
                Err(McpError::new(ErrorKind::MethodNotFound, format!("unknown method `{other}`")))
            }
        }
    }

    async fn read_resource(&self, params: Value) -> Result<Value, McpError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::new(ErrorKind::InvalidParams, "read_resource requires a `uri` string"))?
            .to_string();

        let resolution = self
            .registry
            .resolve_resource(&uri)
            .ok_or_else(|| McpError::new(ErrorKind::ResourceNotFound, format!("no resource matches `{uri}`")))?;

        if resolution.cacheable {
            if let Some(cache) = &self.cache {
                if let Some(items) = cache.get(&uri) {
                    self.metrics.record_cache_hit();
                    let content: Vec<ContentItem> = items.iter().map(|g| (**g).clone()).collect();
                    return Ok(serde_json::json!({ "contents": content }));
                }
                self.metrics.record_cache_miss();
            }
        }

        let handler = resolution.handler.clone();
        let uri_for_task = uri.clone();
        let content = tokio::spawn(async move { handler.read(&uri_for_task).await })
            .await
            .map_err(|e| McpError::new(ErrorKind::Internal, format!("resource handler task panicked: {e}")))??;

        if resolution.cacheable {
            if let Some(cache) = &self.cache {
                cache.put(uri, content.clone(), resolution.ttl);
            }
        }

        Ok(serde_json::json!({ "contents": content }))
    }

    async fn call_tool(&self, params: Value) -> Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::new(ErrorKind::InvalidParams, "call_tool requires a `name` string"))?
            .to_string();
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let (tool, handler) = self
            .registry
            .get_tool(&name)
            .ok_or_else(|| McpError::new(ErrorKind::ToolNotFound, format!("no tool named `{name}`")))?;

        tool.validate_arguments(&arguments)
            .map_err(|e| McpError::new(ErrorKind::InvalidParams, e.to_string()))?;

        tokio::spawn(async move { handler.call(&arguments).await })
            .await
            .map_err(|e| McpError::new(ErrorKind::Internal, format!("tool handler task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{SharedResourceHandler, SharedToolHandler};
    use mcprt_ratelimit::{Algorithm, KeyType, RateLimitRule, RateLimiterConfig};
    use mcprt_cache::config::{CacheConfig, Ttl};
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(DispatcherConfig::default())
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let d = dispatcher();
        let msg = Message::request(1u64, "ping", Value::Null).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        assert_eq!(parsed, Message::success(MessageId(1), serde_json::json!({"pong": true})));
    }

    #[tokio::test]
    async fn notification_produces_no_reply() {
        let d = dispatcher();
        let msg = Message::notification("ping", Value::Null).to_bytes();
        assert!(d.handle_message(&msg, &RequestMeta::default()).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let d = dispatcher();
        let msg = Message::request(1u64, "nonexistent", Value::Null).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::METHOD_NOT_FOUND),
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_with_recoverable_id_gets_parse_error() {
        let d = dispatcher();
        let reply = d
            .handle_message(br#"{"id": 5, "foo": "bar"}"#, &RequestMeta::default())
            .await
            .unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::PARSE_ERROR),
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_tool_validates_arguments_before_invoking_handler() {
        let d = dispatcher();
        let mut tool = Tool::new("echo");
        tool.input_schema.push(mcprt_protocol::ToolInputField {
            name: "text".to_string(),
            ty: "string".to_string(),
            description: None,
            required: true,
        });
        let handler: SharedToolHandler = Arc::new(|args: &Value| {
            let args = args.clone();
            async move { Ok(args) }
        });
        d.registry().register_tool(tool, handler);

        let msg = Message::request(1u64, "call_tool", serde_json::json!({"name": "echo", "arguments": {}})).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::INVALID_PARAMS),
            other => panic!("expected invalid-params error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_tool_invokes_handler_on_valid_arguments() {
        let d = dispatcher();
        let tool = Tool::new("echo");
        let handler: SharedToolHandler = Arc::new(|args: &Value| {
            let args = args.clone();
            async move { Ok(args) }
        });
        d.registry().register_tool(tool, handler);

        let msg = Message::request(1u64, "call_tool", serde_json::json!({"name": "echo", "arguments": {"x": 1}})).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        assert_eq!(parsed, Message::success(MessageId(1), serde_json::json!({"x": 1})));
    }

    #[tokio::test]
    async fn unregistered_tool_is_tool_not_found() {
        let d = dispatcher();
        let msg = Message::request(1u64, "call_tool", serde_json::json!({"name": "missing"})).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::TOOL_NOT_FOUND),
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_resource_returns_resource_not_found_for_unregistered_uri() {
        let d = dispatcher();
        let msg = Message::request(1u64, "read_resource", serde_json::json!({"uri": "file:///nope"})).to_bytes();
        let reply = d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::RESOURCE_NOT_FOUND),
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_denies_third_request_under_max_two_rule() {
        let mut d = dispatcher();
        d = d.with_rate_limiter(RateLimiter::new(RateLimiterConfig::new(vec![RateLimitRule::new(
            KeyType::Ip,
            Algorithm::FixedWindow { max: 2, window_secs: 60 },
            "*",
            0,
        )])));
        let meta = RequestMeta {
            ip: Some("1.2.3.4".to_string()),
            ..Default::default()
        };
        let msg = Message::request(1u64, "ping", Value::Null).to_bytes();
        d.handle_message(&msg, &meta).await.unwrap();
        d.handle_message(&msg, &meta).await.unwrap();
        let reply = d.handle_message(&msg, &meta).await.unwrap();
        let parsed = Message::from_json(&reply).unwrap();
        match parsed {
            Message::Response { error: Some(e), .. } => assert_eq!(e.code, codes::RATE_LIMITED),
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_returns_immediately_with_no_in_flight_requests() {
        let d = dispatcher();
        d.stop().await.unwrap();
        assert!(d.is_shutting_down());
    }

    #[tokio::test]
    async fn resource_cache_hit_skips_handler_invocation() {
        let d = dispatcher().with_cache(ResourceCache::new(CacheConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: SharedResourceHandler = Arc::new(move |_uri: &str| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(vec![ContentItem::text("text/plain", "hi")])
            }
        });
        d.registry().register_resource(Resource::new("mem://x"), handler, true, Ttl::Default);

        let msg = Message::request(1u64, "read_resource", serde_json::json!({"uri": "mem://x"})).to_bytes();
        d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        d.handle_message(&msg, &RequestMeta::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
