//! Fixed-object-size pool with a LIFO free list (spec §4.7).
//!
//! The original implementation hands back uninitialised memory and trusts
//! the caller to initialise it before use and to call a release function
//! afterwards. Rust has no safe way to express "uninitialised, caller must
//! init" without `unsafe`, so this is reworked as a guard: `acquire` always
//! returns a live, freshly-reset `T` (built from a factory on first use or
//! whenever the free list is empty), and `release` happens automatically
//! when the [`PoolGuard`] drops rather than via an explicit caller call.
//! The conservation invariant (`acquires - releases == in_use`) holds the
//! same way; it is just enforced by the borrow checker instead of by
//! convention.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::stats::{PoolCounters, PoolStats};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

struct Inner<T> {
    factory: Factory<T>,
    reset: Reset<T>,
    free: Mutex<Vec<T>>,
    max_capacity: Option<usize>,
    counters: PoolCounters,
}

/// A thread-safe pool of reusable `T` instances.
///
/// Cloning an `ObjectPool` is cheap and shares the same underlying free
/// list (it is an `Arc` handle), matching the teacher's pattern of passing
/// pool handles into handlers and transports by value.
pub struct ObjectPool<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool").field("stats", &self.stats()).finish()
    }
}

impl<T: Send + 'static> ObjectPool<T> {
    /// Build a pool whose slabs are produced by `factory` and whose
    /// contents are scrubbed by `reset` before being handed out again.
    pub fn new(
        factory: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
        max_capacity: Option<usize>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory: Box::new(factory),
                reset: Box::new(reset),
                free: Mutex::new(Vec::new()),
                max_capacity,
                counters: PoolCounters::default(),
            }),
        }
    }

    /// Acquire a slab, creating a new one if the free list is empty and
    /// capacity allows; blocks on nothing (unlike the connection pool's
    /// `get`, object pools never wait — they just allocate past the free
    /// list up to `max_capacity`, or unconditionally if unbounded).
    pub fn acquire(&self) -> PoolGuard<T> {
        let mut free = self.inner.free.lock();
        let (item, created_new) = match free.pop() {
            Some(item) => (item, false),
            None => ((self.inner.factory)(), true),
        };
        drop(free);
        self.inner.counters.record_acquire(created_new);
        PoolGuard {
            pool: self.clone(),
            item: Some(item),
        }
    }

    fn release(&self, mut item: T) {
        (self.inner.reset)(&mut item);
        let mut free = self.inner.free.lock();
        let keep = self
            .inner
            .max_capacity
            .map(|cap| free.len() < cap)
            .unwrap_or(true);
        if keep {
            free.push(item);
        }
        drop(free);
        self.inner.counters.record_release();
    }

    pub fn stats(&self) -> PoolStats {
        let free_len = self.inner.free.lock().len();
        self.inner.counters.snapshot(free_len)
    }
}

/// A slab on loan from an [`ObjectPool`]; returns itself to the pool's
/// free list (after `reset`) when dropped.
pub struct PoolGuard<T: Send + 'static> {
    pool: ObjectPool<T>,
    item: Option<T>,
}

impl<T: Send + 'static> std::ops::Deref for PoolGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.item.as_ref().expect("PoolGuard item taken before drop")
    }
}

impl<T: Send + 'static> std::ops::DerefMut for PoolGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("PoolGuard item taken before drop")
    }
}

impl<T: Send + 'static> Drop for PoolGuard<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn acquire_creates_new_when_free_list_empty() {
        let pool = ObjectPool::new(Vec::<u8>::new, |v: &mut Vec<u8>| v.clear(), None);
        let guard = pool.acquire();
        assert!(guard.is_empty());
        let stats = pool.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.in_use, 1);
    }

    #[test]
    fn release_on_drop_returns_to_free_list_and_resets() {
        let pool = ObjectPool::new(Vec::<u8>::new, |v: &mut Vec<u8>| v.clear(), None);
        {
            let mut guard = pool.acquire();
            guard.push(1);
            guard.push(2);
        }
        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.free, 1);

        let guard = pool.acquire();
        assert!(guard.is_empty(), "reset must run before reuse");
        assert_eq!(pool.stats().total, 1, "reused the freed slab, no new allocation");
    }

    #[test]
    fn conservation_holds_under_concurrent_use() {
        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = Arc::clone(&created);
        let pool = ObjectPool::new(
            move || {
                created_clone.fetch_add(1, Ordering::Relaxed);
                0u32
            },
            |_: &mut u32| {},
            None,
        );

        let mut guards = Vec::new();
        for _ in 0..5 {
            guards.push(pool.acquire());
        }
        assert_eq!(pool.stats().in_use, 5);
        drop(guards);
        assert_eq!(pool.stats().in_use, 0);
        assert_eq!(pool.stats().total, 5);

        // Reacquiring reuses the five freed slabs rather than allocating more.
        let mut guards = Vec::new();
        for _ in 0..5 {
            guards.push(pool.acquire());
        }
        assert_eq!(pool.stats().total, 5);
        drop(guards);
    }

    #[test]
    fn max_capacity_drops_excess_on_release() {
        let pool = ObjectPool::new(|| 0u8, |_: &mut u8| {}, Some(1));
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        // Only one slot is retained; the second release is discarded.
        assert_eq!(pool.stats().free, 1);
    }
}
