//! LRU resource cache with TTL, reader-writer concurrency, and pooled
//! content items (spec §4.6).

mod arena;
pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CachedItem, ResourceCache};
pub use config::{CacheConfig, Ttl};
pub use error::CacheError;
