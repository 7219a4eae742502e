//! Reusable fixed-size allocations (spec §4.7): an object pool for
//! arbitrary pooled types (cache entries, content items) and a buffer
//! pool specialised for transport receive scratch space.

pub mod buffer_pool;
pub mod object_pool;
mod stats;

pub use buffer_pool::{BufferGuard, BufferPool};
pub use object_pool::{ObjectPool, PoolGuard};
pub use stats::PoolStats;
