//! Transport performance counters, exposed via the dispatcher's
//! `get_performance_metrics` built-in method (spec §4.9 step 4).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportMetrics {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connections_accepted: u64,
    pub connections_failed: u64,
    pub active_connections: u64,
    pub average_latency_ms: f64,
}

/// Lock-free counters updated on the hot send/receive path; `snapshot`
/// produces the serializable [`TransportMetrics`] on demand.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub connections_accepted: AtomicU64,
    pub connections_failed: AtomicU64,
    pub active_connections: AtomicU64,
    avg_latency_us: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exponential moving average, alpha = 0.1, saturating to avoid overflow
    /// under sustained high-latency conditions.
    pub fn record_latency_us(&self, latency_us: u64) {
        let current = self.avg_latency_us.load(Ordering::Relaxed);
        let new_avg = if current == 0 {
            latency_us
        } else {
            current.saturating_mul(9).saturating_add(latency_us) / 10
        };
        self.avg_latency_us.store(new_avg, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportMetrics {
        TransportMetrics {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            average_latency_ms: self.avg_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }

    pub fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.connections_accepted.store(0, Ordering::Relaxed);
        self.connections_failed.store(0, Ordering::Relaxed);
        self.avg_latency_us.store(0, Ordering::Relaxed);
        // active_connections is a gauge, not a counter, and survives reset.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_counters_but_not_gauge() {
        let m = AtomicMetrics::new();
        m.bytes_sent.fetch_add(10, Ordering::Relaxed);
        m.active_connections.fetch_add(3, Ordering::Relaxed);
        m.reset();
        let snap = m.snapshot();
        assert_eq!(snap.bytes_sent, 0);
        assert_eq!(snap.active_connections, 3);
    }

    #[test]
    fn latency_ema_does_not_overflow() {
        let m = AtomicMetrics::new();
        for _ in 0..50 {
            m.record_latency_us(u64::MAX / 4);
        }
        assert!(m.snapshot().average_latency_ms.is_finite());
    }
}
