//! `WsConfig`/`ReconnectConfig` (spec §4.3's reconnection parameters,
//! reused verbatim for the WebSocket half of the connection pool per §4.8).

use std::time::Duration;

use serde::{Deserialize, Serialize};

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
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay_ms as f64 * self.backoff_factor.powi(attempt as i32 - 1);
        let capped = scaled.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enable && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    pub url: String,
    pub max_message_size: usize,
    pub connect_timeout_ms: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080".to_string(),
            max_message_size: mcprt_protocol::MAX_MESSAGE_SIZE,
            connect_timeout_ms: 5_000,
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_max_delay() {
        let cfg = ReconnectConfig {
            initial_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 4000,
            ..Default::default()
        };
        assert_eq!(cfg.base_delay(1), Duration::from_millis(1000));
        assert_eq!(cfg.base_delay(3), Duration::from_millis(4000));
        assert_eq!(cfg.base_delay(10), Duration::from_millis(4000));
    }

    #[test]
    fn zero_max_attempts_means_infinite_retry() {
        let cfg = ReconnectConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(cfg.should_retry(500));
    }
}
