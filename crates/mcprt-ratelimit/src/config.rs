//! Advanced rate limiter configuration (spec §4.10).

use crate::rule::RateLimitRule;

/// Dynamic mode: when the recent denial rate crosses `threshold_for_tightening`,
/// every live bucket's rate is halved; when it falls back under
/// `threshold_for_relaxing`, the halving is undone. Evaluated over a
/// rolling sample of `sample_size` recent decisions.
#[derive(Debug, Clone)]
pub struct DynamicConfig {
    pub threshold_for_tightening: f64,
    pub threshold_for_relaxing: f64,
    pub sample_size: usize,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            threshold_for_tightening: 0.5,
            threshold_for_relaxing: 0.1,
            sample_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateLimiterConfig {
    pub rules: Vec<RateLimitRule>,
    pub dynamic: Option<DynamicConfig>,
}

impl RateLimiterConfig {
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self { rules, dynamic: None }
    }

    pub fn with_dynamic(mut self, dynamic: DynamicConfig) -> Self {
        self.dynamic = Some(dynamic);
        self
    }
}
