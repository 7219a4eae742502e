//! Configuration for the Streamable HTTP transport (spec §4.2, §6).

use std::time::Duration;

/// Configuration for the Streamable HTTP transport.
#[derive(Clone, Debug)]
pub struct StreamableConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,

    /// Path the MCP endpoint is mounted at. Default: `/mcp`.
    pub mcp_endpoint: String,

    /// Maximum session duration in milliseconds.
    ///
    /// Sessions older than this are automatically terminated.
    /// Default: 24 hours (86,400,000 ms)
    pub session_timeout_ms: u64,

    /// Session idle timeout in milliseconds.
    ///
    /// Sessions with no activity for this duration are terminated.
    /// Default: 30 minutes (1,800,000 ms)
    pub idle_timeout_ms: u64,

    /// Whether session-based routing is enabled.
    ///
    /// When enabled, requests with `Mcp-Session-Id` are routed to existing sessions,
    /// and a session id is allocated for new streams.
    /// Default: true
    pub enable_sessions: bool,

    /// Whether the SSE event store keeps a replay buffer for `Last-Event-ID`
    /// resumability (spec §4.5). Default: true.
    pub enable_sse_resumability: bool,

    /// Maximum number of events retained per session stream for replay.
    /// Older events are evicted once this limit is reached.
    /// Default: 1000
    pub max_stored_events: usize,

    /// Maximum number of concurrent SSE clients across all sessions.
    /// New GET streams beyond this are rejected with 503. Default: 1000.
    pub max_sse_clients: usize,

    /// Whether to send periodic SSE heartbeat comments to keep
    /// intermediaries from closing idle connections. Default: true.
    pub send_heartbeats: bool,

    /// Heartbeat interval in milliseconds. Default: 15 seconds.
    pub heartbeat_interval_ms: u64,

    /// SSE retry interval suggested to clients (in milliseconds).
    ///
    /// Clients should wait this long before reconnecting.
    /// Default: 3 seconds (3,000 ms)
    pub retry_interval_ms: u32,

    /// Whether to validate the `Origin` header against `allowed_origins`.
    /// Default: false
    pub validate_origin: bool,

    /// Origins allowed to connect. Entries may end in `*` to glob-match the
    /// remainder of the host (e.g. `https://*.example.com`). Empty means all
    /// origins are allowed.
    pub allowed_origins: Vec<String>,

    /// Whether to emit CORS response headers. Default: true.
    pub enable_cors: bool,

    /// `Access-Control-Allow-Methods` value.
    pub cors_allow_methods: Vec<String>,

    /// `Access-Control-Allow-Headers` value.
    pub cors_allow_headers: Vec<String>,

    /// `Access-Control-Max-Age` in seconds.
    pub cors_max_age: u64,

    /// Whether to additionally mount the legacy HTTP+SSE endpoints
    /// (separate `/sse` and `/message` routes) alongside the unified
    /// Streamable HTTP endpoint, for clients predating the 2025-03-26
    /// protocol revision. Default: false.
    pub enable_legacy_endpoints: bool,

    /// Maximum request body size in bytes.
    ///
    /// Default: 1 MB (1,048,576 bytes)
    pub max_body_size: usize,

    /// Maximum concurrent SSE streams per session.
    ///
    /// Default: 1
    pub max_streams_per_session: usize,
}

impl Default for StreamableConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            mcp_endpoint: "/mcp".to_string(),
            session_timeout_ms: 24 * 60 * 60 * 1000,
            idle_timeout_ms: 30 * 60 * 1000,
            enable_sessions: true,
            enable_sse_resumability: true,
            max_stored_events: 1000,
            max_sse_clients: 1000,
            send_heartbeats: true,
            heartbeat_interval_ms: 15_000,
            retry_interval_ms: 3_000,
            validate_origin: false,
            allowed_origins: Vec::new(),
            enable_cors: true,
            cors_allow_methods: vec!["GET".into(), "POST".into(), "DELETE".into(), "OPTIONS".into()],
            cors_allow_headers: vec![
                "Content-Type".into(),
                "Mcp-Session-Id".into(),
                "Last-Event-ID".into(),
            ],
            cors_max_age: 86_400,
            enable_legacy_endpoints: false,
            max_body_size: 1024 * 1024,
            max_streams_per_session: 1,
        }
    }
}

impl StreamableConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal configuration for testing.
    pub fn minimal() -> Self {
        Self {
            session_timeout_ms: 60_000,
            idle_timeout_ms: 30_000,
            max_stored_events: 100,
            max_sse_clients: 16,
            heartbeat_interval_ms: 5_000,
            retry_interval_ms: 1_000,
            max_body_size: 64 * 1024,
            ..Self::default()
        }
    }

    /// Create a production configuration with sensible defaults.
    pub fn production() -> Self {
        Self {
            session_timeout_ms: 8 * 60 * 60 * 1000,
            idle_timeout_ms: 60 * 60 * 1000,
            max_stored_events: 5000,
            heartbeat_interval_ms: 30_000,
            retry_interval_ms: 5_000,
            validate_origin: true,
            max_body_size: 4 * 1024 * 1024,
            max_streams_per_session: 2,
            ..Self::default()
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Set the session timeout.
    pub fn with_session_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.session_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum events stored per session stream.
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_stored_events = max_events;
        self
    }

    /// Set the heartbeat interval.
    pub fn with_heartbeat_interval_ms(mut self, interval_ms: u64) -> Self {
        self.heartbeat_interval_ms = interval_ms;
        self
    }

    /// Set the retry interval.
    pub fn with_retry_interval_ms(mut self, interval_ms: u32) -> Self {
        self.retry_interval_ms = interval_ms;
        self
    }

    /// Enable or disable sessions.
    pub fn with_sessions(mut self, enable: bool) -> Self {
        self.enable_sessions = enable;
        self
    }

    /// Set allowed origins for CORS and origin validation.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Add an allowed origin.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Require origin validation.
    pub fn with_require_origin(mut self, require: bool) -> Self {
        self.validate_origin = require;
        self
    }

    /// Set maximum body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set maximum streams per session.
    pub fn with_max_streams(mut self, max_streams: usize) -> Self {
        self.max_streams_per_session = max_streams;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamableConfig::default();
        assert_eq!(config.session_timeout_ms, 24 * 60 * 60 * 1000);
        assert_eq!(config.idle_timeout_ms, 30 * 60 * 1000);
        assert!(config.enable_sessions);
        assert_eq!(config.mcp_endpoint, "/mcp");
    }

    #[test]
    fn test_minimal_config() {
        let config = StreamableConfig::minimal();
        assert_eq!(config.session_timeout_ms, 60_000);
        assert_eq!(config.max_stored_events, 100);
    }

    #[test]
    fn test_production_config() {
        let config = StreamableConfig::production();
        assert!(config.validate_origin);
        assert_eq!(config.max_streams_per_session, 2);
    }

    #[test]
    fn test_builder_pattern() {
        let config = StreamableConfig::new()
            .with_session_timeout_ms(60_000)
            .with_idle_timeout_ms(30_000)
            .with_max_events(500)
            .allow_origin("https://example.com")
            .with_require_origin(true);

        assert_eq!(config.session_timeout_ms, 60_000);
        assert_eq!(config.idle_timeout_ms, 30_000);
        assert_eq!(config.max_stored_events, 500);
        assert_eq!(config.allowed_origins, vec!["https://example.com"]);
        assert!(config.validate_origin);
    }
}
