//! Per-key (IP/user/API-key/custom), multi-algorithm rate limiter with
//! dynamic rule selection (spec §4.10).

pub mod algorithm;
pub mod config;
pub mod limiter;
pub mod rule;

pub use algorithm::AlgorithmState;
pub use config::{DynamicConfig, RateLimiterConfig};
pub use limiter::RateLimiter;
pub use rule::{Algorithm, KeyType, RateLimitRule};
