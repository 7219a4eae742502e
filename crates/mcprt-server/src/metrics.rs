//! Dispatcher performance counters, backing the `get_performance_metrics`
//! and `reset_performance_metrics` built-in methods (spec §4.9 step 4).
//! Same lock-free-counter-plus-EMA shape as `mcprt_transport::AtomicMetrics`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub requests_total: u64,
    pub requests_ok: u64,
    pub requests_error: u64,
    pub requests_rate_limited: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub average_latency_ms: f64,
}

#[derive(Debug, Default)]
pub struct AtomicPerformanceMetrics {
    requests_total: AtomicU64,
    requests_ok: AtomicU64,
    requests_error: AtomicU64,
    requests_rate_limited: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    avg_latency_us: AtomicU64,
}

impl AtomicPerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, ok: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.requests_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rate_limited(&self) {
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Exponential moving average, alpha = 0.1, mirroring
    /// `mcprt_transport::AtomicMetrics::record_latency_us`.
    pub fn record_latency_us(&self, latency_us: u64) {
        let current = self.avg_latency_us.load(Ordering::Relaxed);
        let new_avg = if current == 0 {
            latency_us
        } else {
            current.saturating_mul(9).saturating_add(latency_us) / 10
        };
        self.avg_latency_us.store(new_avg, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_ok: self.requests_ok.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            requests_rate_limited: self.requests_rate_limited.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            average_latency_ms: self.avg_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }

    pub fn reset(&self) {
        self.requests_total.store(0, Ordering::Relaxed);
        self.requests_ok.store(0, Ordering::Relaxed);
        self.requests_error.store(0, Ordering::Relaxed);
        self.requests_rate_limited.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.avg_latency_us.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_all_counters() {
        let m = AtomicPerformanceMetrics::new();
        m.record_request(true);
        m.record_cache_hit();
        m.reset();
        let snap = m.snapshot();
        assert_eq!(snap.requests_total, 0);
        assert_eq!(snap.cache_hits, 0);
    }
}
