//! Rate-limit rule configuration (spec §4.10): which key a rule applies to,
//! which algorithm enforces it, and at what priority rules compete.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Ip,
    User,
    ApiKey,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Algorithm {
    FixedWindow { max: u64, window_secs: u64 },
    SlidingWindow { max: u64, window_secs: u64 },
    TokenBucket { rate_per_sec: f64, max_tokens: f64 },
    LeakyBucket { leak_rate_per_sec: f64, burst_capacity: f64 },
}

/// One configured rule. `key_pattern` is a prefix glob (trailing `*`)
/// matched against the rendered key string; the highest-`priority` rule
/// whose pattern matches wins (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub key_type: KeyType,
    pub algorithm: Algorithm,
    pub key_pattern: String,
    pub priority: i32,
}

impl RateLimitRule {
    pub fn new(key_type: KeyType, algorithm: Algorithm, key_pattern: impl Into<String>, priority: i32) -> Self {
        Self {
            key_type,
            algorithm,
            key_pattern: key_pattern.into(),
            priority,
        }
    }

    pub fn matches_key(&self, key: &str) -> bool {
        match self.key_pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => self.key_pattern == key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_glob_matches() {
        let rule = RateLimitRule::new(
            KeyType::ApiKey,
            Algorithm::FixedWindow { max: 10, window_secs: 1 },
            "key-*",
            0,
        );
        assert!(rule.matches_key("key-abc"));
        assert!(!rule.matches_key("other"));
    }

    #[test]
    fn exact_pattern_without_glob() {
        let rule = RateLimitRule::new(
            KeyType::Ip,
            Algorithm::FixedWindow { max: 1, window_secs: 1 },
            "127.0.0.1",
            0,
        );
        assert!(rule.matches_key("127.0.0.1"));
        assert!(!rule.matches_key("127.0.0.2"));
    }
}
