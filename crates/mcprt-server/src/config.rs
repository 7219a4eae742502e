//! Dispatcher configuration (spec §4.9, §6).

use std::time::Duration;

use mcprt_ratelimit::KeyType;

/// Which field(s) on an inbound request compose the rate-limiter key
/// (spec §4.9 step 3: "compose key from configured
/// `(ip|user|api_key|custom)` fields").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKeySource {
    Ip,
    User,
    ApiKey,
    Custom,
}

impl From<RateLimitKeySource> for KeyType {
    fn from(source: RateLimitKeySource) -> Self {
        match source {
            RateLimitKeySource::Ip => KeyType::Ip,
            RateLimitKeySource::User => KeyType::User,
            RateLimitKeySource::ApiKey => KeyType::ApiKey,
            RateLimitKeySource::Custom => KeyType::Custom,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub rate_limit_key_source: RateLimitKeySource,
    /// Bound on how long `stop()` waits for in-flight requests to drain
    /// before abandoning them (spec §4.9 "Graceful shutdown").
    pub shutdown_deadline: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            rate_limit_key_source: RateLimitKeySource::Ip,
            shutdown_deadline: Duration::from_secs(30),
        }
    }
}
