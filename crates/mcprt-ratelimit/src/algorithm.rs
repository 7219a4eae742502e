//! The four rate-limit algorithm state machines (spec §4.10). Each keeps
//! its own per-key state shape; [`AlgorithmState::check`] evaluates one
//! request arrival against `now` and mutates the state accordingly.

use std::time::{Duration, Instant};

use crate::rule::Algorithm;

#[derive(Debug, Clone)]
pub enum AlgorithmState {
    FixedWindow {
        max: u64,
        window: Duration,
        window_start: Instant,
        count: u64,
    },
    SlidingWindow {
        max: u64,
        window: Duration,
        current_start: Instant,
        current_count: u64,
        previous_count: u64,
    },
    TokenBucket {
        rate_per_sec: f64,
        max_tokens: f64,
        tokens: f64,
        last_refill: Instant,
    },
    LeakyBucket {
        leak_rate_per_sec: f64,
        burst_capacity: f64,
        level: f64,
        last_drain: Instant,
    },
}

impl AlgorithmState {
    pub fn new(algorithm: Algorithm, now: Instant) -> Self {
        match algorithm {
            Algorithm::FixedWindow { max, window_secs } => AlgorithmState::FixedWindow {
                max,
                window: Duration::from_secs(window_secs.max(1)),
                window_start: now,
                count: 0,
            },
            Algorithm::SlidingWindow { max, window_secs } => AlgorithmState::SlidingWindow {
                max,
                window: Duration::from_secs(window_secs.max(1)),
                current_start: now,
                current_count: 0,
                previous_count: 0,
            },
            Algorithm::TokenBucket { rate_per_sec, max_tokens } => AlgorithmState::TokenBucket {
                rate_per_sec,
                max_tokens,
                tokens: max_tokens,
                last_refill: now,
            },
            Algorithm::LeakyBucket { leak_rate_per_sec, burst_capacity } => AlgorithmState::LeakyBucket {
                leak_rate_per_sec,
                burst_capacity,
                level: 0.0,
                last_drain: now,
            },
        }
    }

    /// Halve (tighten) or double-back (relax) the algorithm's effective
    /// rate, for the advanced limiter's dynamic mode (spec §4.10).
    pub fn scale_rate(&mut self, factor: f64) {
        match self {
            AlgorithmState::FixedWindow { max, .. } => {
                *max = ((*max as f64) * factor).max(1.0) as u64;
            }
            AlgorithmState::SlidingWindow { max, .. } => {
                *max = ((*max as f64) * factor).max(1.0) as u64;
            }
            AlgorithmState::TokenBucket { rate_per_sec, max_tokens, .. } => {
                *rate_per_sec *= factor;
                *max_tokens *= factor;
            }
            AlgorithmState::LeakyBucket { leak_rate_per_sec, burst_capacity, .. } => {
                *leak_rate_per_sec *= factor;
                *burst_capacity *= factor;
            }
        }
    }

    /// Evaluate one arrival at `now`; returns whether it is allowed.
    pub fn check(&mut self, now: Instant) -> bool {
        match self {
            AlgorithmState::FixedWindow { max, window, window_start, count } => {
                if now.duration_since(*window_start) >= *window {
                    *window_start = now;
                    *count = 0;
                }
                if *count < *max {
                    *count += 1;
                    true
                } else {
                    false
                }
            }
            AlgorithmState::SlidingWindow { max, window, current_start, current_count, previous_count } => {
                let elapsed = now.duration_since(*current_start);
                if elapsed >= *window * 2 {
                    *previous_count = 0;
                    *current_count = 0;
                    *current_start = now;
                } else if elapsed >= *window {
                    *previous_count = *current_count;
                    *current_count = 0;
                    *current_start = *current_start + *window;
                }

                let elapsed_in_current = now.duration_since(*current_start).as_secs_f64();
                let window_secs = window.as_secs_f64();
                let weight = ((window_secs - elapsed_in_current) / window_secs).clamp(0.0, 1.0);
                let weighted = (*previous_count as f64) * weight + (*current_count as f64);

                if weighted < *max as f64 {
                    *current_count += 1;
                    true
                } else {
                    false
                }
            }
            AlgorithmState::TokenBucket { rate_per_sec, max_tokens, tokens, last_refill } => {
                let elapsed = now.duration_since(*last_refill).as_secs_f64();
                *tokens = (*tokens + elapsed * *rate_per_sec).min(*max_tokens);
                *last_refill = now;
                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    true
                } else {
                    false
                }
            }
            AlgorithmState::LeakyBucket { leak_rate_per_sec, burst_capacity, level, last_drain } => {
                let elapsed = now.duration_since(*last_drain).as_secs_f64();
                *level = (*level - elapsed * *leak_rate_per_sec).max(0.0);
                *last_drain = now;
                if *level < *burst_capacity {
                    *level += 1.0;
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_window_allows_up_to_max_then_denies() {
        let mut s = AlgorithmState::new(Algorithm::FixedWindow { max: 3, window_secs: 60 }, Instant::now());
        let now = Instant::now();
        assert!(s.check(now));
        assert!(s.check(now));
        assert!(s.check(now));
        assert!(!s.check(now));
    }

    #[test]
    fn fixed_window_resets_after_window_elapses() {
        let start = Instant::now();
        let mut s = AlgorithmState::new(Algorithm::FixedWindow { max: 1, window_secs: 1 }, start);
        assert!(s.check(start));
        assert!(!s.check(start));
        assert!(s.check(start + Duration::from_millis(1100)));
    }

    #[test]
    fn token_bucket_spec_seed_scenario() {
        // spec §8: rate=1/s, capacity=3; 3 immediate allowed, 4th denied,
        // after 1s wait one more allowed.
        let start = Instant::now();
        let mut s = AlgorithmState::new(
            Algorithm::TokenBucket { rate_per_sec: 1.0, max_tokens: 3.0 },
            start,
        );
        assert!(s.check(start));
        assert!(s.check(start));
        assert!(s.check(start));
        assert!(!s.check(start));
        assert!(s.check(start + Duration::from_secs(1)));
    }

    #[test]
    fn leaky_bucket_drains_over_time() {
        let start = Instant::now();
        let mut s = AlgorithmState::new(
            Algorithm::LeakyBucket { leak_rate_per_sec: 1.0, burst_capacity: 2.0 },
            start,
        );
        assert!(s.check(start));
        assert!(s.check(start));
        assert!(!s.check(start));
        assert!(s.check(start + Duration::from_secs(1)));
    }

    #[test]
    fn sliding_window_allows_up_to_max_in_one_window() {
        let start = Instant::now();
        let mut s = AlgorithmState::new(
            Algorithm::SlidingWindow { max: 2, window_secs: 60 },
            start,
        );
        assert!(s.check(start));
        assert!(s.check(start));
        assert!(!s.check(start));
    }

    #[test]
    fn monotonicity_increasing_limit_never_reduces_allow_count() {
        // spec §8 "Rate-limiter monotonicity" testable property, checked
        // against a fixed arrival trace for the token bucket algorithm.
        let trace: Vec<Instant> = {
            let start = Instant::now();
            (0..10).map(|i| start + Duration::from_millis(i * 100)).collect()
        };

        let run = |max_tokens: f64| {
            let mut s = AlgorithmState::new(
                Algorithm::TokenBucket { rate_per_sec: 0.1, max_tokens },
                trace[0],
            );
            trace.iter().filter(|&&t| s.check(t)).count()
        };

        assert!(run(5.0) >= run(2.0));
    }
}
