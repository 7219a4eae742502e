//! Resource cache configuration (spec §4.6, §6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of distinct keys retained (spec §8 "cache size bound").
    pub capacity: usize,
    /// TTL applied when `put` is called with `ttl == 0`.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            default_ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self { capacity, default_ttl }
    }
}

/// `put(ttl)` sign convention from spec §4.6: zero means "use the cache's
/// configured default", negative means "never expires", positive is an
/// explicit duration in seconds.
#[derive(Debug, Clone, Copy)]
pub enum Ttl {
    Default,
    Never,
    Seconds(u64),
}

impl Ttl {
    pub fn from_signed_seconds(ttl: i64) -> Self {
        match ttl.cmp(&0) {
            std::cmp::Ordering::Equal => Ttl::Default,
            std::cmp::Ordering::Less => Ttl::Never,
            std::cmp::Ordering::Greater => Ttl::Seconds(ttl as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_convention_matches_spec() {
        assert!(matches!(Ttl::from_signed_seconds(0), Ttl::Default));
        assert!(matches!(Ttl::from_signed_seconds(-1), Ttl::Never));
        assert!(matches!(Ttl::from_signed_seconds(60), Ttl::Seconds(60)));
    }
}
