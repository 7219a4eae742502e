//! The advanced rate limiter (spec §4.10): rule selection by key, per-key
//! algorithm state, and an optional dynamic tightening/relaxing mode
//! driven by the recent denial rate.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;

use crate::algorithm::AlgorithmState;
use crate::config::RateLimiterConfig;
use crate::rule::{KeyType, RateLimitRule};

struct KeyState {
    rule_pattern: String,
    state: AlgorithmState,
}

struct Inner {
    states: HashMap<String, KeyState>,
    recent: VecDeque<bool>,
    tightened: bool,
}

/// Per-key, multi-algorithm rate limiter with dynamic rule selection.
///
/// Rules are matched by `(key_type, key_pattern)`; among rules matching a
/// given request's key, the highest-`priority` one fires. A key with no
/// matching rule is unlimited (spec is silent on a default-deny posture;
/// explicit rules are the only source of limits, matching how every other
/// component in this workspace treats "no configuration" as "no-op").
pub struct RateLimiter {
    rules: Vec<RateLimitRule>,
    dynamic: Option<crate::config::DynamicConfig>,
    inner: Mutex<Inner>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            rules: config.rules,
            dynamic: config.dynamic,
            inner: Mutex::new(Inner {
                states: HashMap::new(),
                recent: VecDeque::new(),
                tightened: false,
            }),
        }
    }

    fn select_rule(&self, key_type: KeyType, key: &str) -> Option<&RateLimitRule> {
        self.rules
            .iter()
            .filter(|r| r.key_type == key_type && r.matches_key(key))
            .max_by_key(|r| r.priority)
    }

    /// Check whether a request identified by `(key_type, key)` is allowed
    /// right now, applying the highest-priority matching rule.
    pub fn check(&self, key_type: KeyType, key: &str) -> bool {
        self.check_at(key_type, key, Instant::now())
    }

    pub fn check_at(&self, key_type: KeyType, key: &str, now: Instant) -> bool {
        let Some(rule) = self.select_rule(key_type, key) else {
            return true;
        };

        let mut inner = self.inner.lock();
        let tightened = inner.tightened;
        let entry = inner.states.entry(key.to_string()).or_insert_with(|| KeyState {
            rule_pattern: rule.key_pattern.clone(),
            state: AlgorithmState::new(rule.algorithm, now),
        });

        if entry.rule_pattern != rule.key_pattern {
            // The matching rule for this key changed (config reload); start fresh.
            entry.rule_pattern = rule.key_pattern.clone();
            entry.state = AlgorithmState::new(rule.algorithm, now);
            if tightened {
                entry.state.scale_rate(0.5);
            }
        }

        let allowed = entry.state.check(now);
        self.record_outcome(&mut inner, allowed);
        allowed
    }

    fn record_outcome(&self, inner: &mut Inner, allowed: bool) {
        let Some(dynamic) = &self.dynamic else { return };

        inner.recent.push_back(allowed);
        while inner.recent.len() > dynamic.sample_size {
            inner.recent.pop_front();
        }
        if inner.recent.len() < dynamic.sample_size {
            return;
        }

        let denials = inner.recent.iter().filter(|&&a| !a).count();
        let denial_rate = denials as f64 / inner.recent.len() as f64;

        if !inner.tightened && denial_rate > dynamic.threshold_for_tightening {
            inner.tightened = true;
            for key_state in inner.states.values_mut() {
                key_state.state.scale_rate(0.5);
            }
            tracing::warn!(denial_rate, "rate limiter tightening: halving bucket rates");
        } else if inner.tightened && denial_rate < dynamic.threshold_for_relaxing {
            inner.tightened = false;
            for key_state in inner.states.values_mut() {
                key_state.state.scale_rate(2.0);
            }
            tracing::info!(denial_rate, "rate limiter relaxing: restoring bucket rates");
        }
    }

    pub fn is_tightened(&self) -> bool {
        self.inner.lock().tightened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Algorithm;
    use std::time::Duration;

    #[test]
    fn no_matching_rule_is_unlimited() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        for _ in 0..100 {
            assert!(limiter.check(KeyType::Ip, "1.2.3.4"));
        }
    }

    #[test]
    fn token_bucket_seed_scenario_through_limiter() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(vec![RateLimitRule::new(
            KeyType::ApiKey,
            Algorithm::TokenBucket { rate_per_sec: 1.0, max_tokens: 3.0 },
            "*",
            0,
        )]));
        let start = Instant::now();
        assert!(limiter.check_at(KeyType::ApiKey, "k1", start));
        assert!(limiter.check_at(KeyType::ApiKey, "k1", start));
        assert!(limiter.check_at(KeyType::ApiKey, "k1", start));
        assert!(!limiter.check_at(KeyType::ApiKey, "k1", start));
        assert!(limiter.check_at(KeyType::ApiKey, "k1", start + Duration::from_secs(1)));
    }

    #[test]
    fn higher_priority_rule_wins() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(vec![
            RateLimitRule::new(KeyType::Ip, Algorithm::FixedWindow { max: 1, window_secs: 60 }, "*", 0),
            RateLimitRule::new(KeyType::Ip, Algorithm::FixedWindow { max: 5, window_secs: 60 }, "*", 10),
        ]));
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_at(KeyType::Ip, "1.2.3.4", now));
        }
        assert!(!limiter.check_at(KeyType::Ip, "1.2.3.4", now));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(vec![RateLimitRule::new(
            KeyType::User,
            Algorithm::FixedWindow { max: 1, window_secs: 60 },
            "*",
            0,
        )]));
        let now = Instant::now();
        assert!(limiter.check_at(KeyType::User, "alice", now));
        assert!(limiter.check_at(KeyType::User, "bob", now));
        assert!(!limiter.check_at(KeyType::User, "alice", now));
    }

    #[test]
    fn dynamic_mode_tightens_under_sustained_denials() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::new(vec![RateLimitRule::new(
                KeyType::Ip,
                Algorithm::FixedWindow { max: 1, window_secs: 3600 },
                "*",
                0,
            )])
            .with_dynamic(crate::config::DynamicConfig {
                threshold_for_tightening: 0.5,
                threshold_for_relaxing: 0.1,
                sample_size: 10,
            }),
        );
        let now = Instant::now();
        // First request per key allowed, rest denied: drive denial rate up
        // using many distinct keys sharing the same rule.
        for i in 0..20 {
            limiter.check_at(KeyType::Ip, &format!("k{i}"), now);
            limiter.check_at(KeyType::Ip, &format!("k{i}"), now);
        }
        assert!(limiter.is_tightened());
    }
}
