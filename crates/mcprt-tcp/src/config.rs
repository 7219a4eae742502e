//! `TcpConfig`/`ReconnectConfig` builders (spec §4.3, §6), following the
//! teacher's `TcpTransportBuilder` pattern.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client reconnection policy (spec §4.3): exponential backoff, optional
/// jitter, capped delay, bounded attempts (`0` = infinite).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enable: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub randomize: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_attempts: 0,
            initial_delay_ms: 250,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
            randomize: true,
        }
    }
}

impl ReconnectConfig {
    /// The delay before the `attempt`-th reconnect (1-indexed), before
    /// jitter is applied: `initial * backoff^(attempt-1)`, capped at
    /// `max_delay_ms`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay_ms as f64 * self.backoff_factor.powi(attempt as i32 - 1);
        let capped = scaled.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Whether `attempt` (1-indexed) should still be tried.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enable && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub bind_addr: SocketAddr,
    pub remote_addr: Option<SocketAddr>,
    pub max_message_size: usize,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("valid default bind addr"),
            remote_addr: None,
            max_message_size: mcprt_protocol::MAX_MESSAGE_SIZE,
            connect_timeout_ms: 5_000,
            idle_timeout_ms: 0,
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TcpConfigBuilder {
    config: TcpConfig,
}

impl TcpConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TcpConfig::default(),
        }
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.config.remote_addr = Some(addr);
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    pub fn build(self) -> TcpConfig {
        self.config
    }
}
