//! LRU resource cache with TTL (spec §4.6).
//!
//! Entries live in an [`crate::arena::Arena`] indexed by a `HashMap<String,
//! usize>`; recency order is tracked by a parallel [`crate::arena::LruList`]
//! over the same indices. Both structures, plus the key map, sit behind one
//! `parking_lot::RwLock` — `get` takes the read lock for lookup, then drops
//! it and re-acquires the write lock to reorder the LRU list, double
//! checking the entry is still present and unexpired after the re-acquire
//! (spec §4.6 "double-checks the entry's validity after re-acquire").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use mcprt_protocol::ContentItem;
use mcprt_pool::{ObjectPool, PoolGuard};

use crate::arena::{Arena, LruList};
use crate::config::{CacheConfig, Ttl};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expiry {
    Never,
    At(Instant),
}

impl Expiry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Expiry::At(t) if now >= *t)
    }
}

struct Entry {
    key: String,
    content: Vec<ContentItem>,
    expiry: Expiry,
    last_accessed: Instant,
}

struct State {
    arena: Arena<Entry>,
    lru: LruList,
    index: HashMap<String, usize>,
}

impl State {
    fn new() -> Self {
        Self {
            arena: Arena::new(),
            lru: LruList::new(),
            index: HashMap::new(),
        }
    }

    fn remove_index(&mut self, idx: usize) -> Entry {
        self.lru.unlink(idx);
        let entry = self.arena.remove(idx);
        self.index.remove(&entry.key);
        entry
    }
}

/// An owned copy of one cache entry's content, returned by [`ResourceCache::get`].
///
/// Each item is pool-backed (spec §4.6 "Returns an array of pool-backed
/// item copies"); dropping the returned `Vec` releases every item back to
/// the content-item pool automatically, which stands in for the spec's
/// explicit release-helper call.
pub type CachedItem = PoolGuard<ContentItem>;

/// LRU cache of resource content, with per-entry TTL and copy-in/copy-out
/// semantics so callers never alias the cache's internal buffers.
pub struct ResourceCache {
    config: CacheConfig,
    state: RwLock<State>,
    pool: ObjectPool<ContentItem>,
}

impl ResourceCache {
    pub fn new(config: CacheConfig) -> Self {
        let pool = ObjectPool::new(
            || ContentItem::text("text/plain", ""),
            |item: &mut ContentItem| {
                item.data.clear();
                item.mime_type.clear();
                item.size = 0;
            },
            None,
        );
        Self {
            config,
            state: RwLock::new(State::new()),
            pool,
        }
    }

    fn resolve_expiry(&self, ttl: Ttl, now: Instant) -> Expiry {
        match ttl {
            Ttl::Default => Expiry::At(now + self.config.default_ttl),
            Ttl::Never => Expiry::Never,
            Ttl::Seconds(s) => Expiry::At(now + Duration::from_secs(s)),
        }
    }

    fn copy_out(&self, items: &[ContentItem]) -> Vec<CachedItem> {
        items
            .iter()
            .map(|item| {
                let mut guard = self.pool.acquire();
                *guard = item.deep_clone();
                guard
            })
            .collect()
    }

    /// Fetch a cache entry, promoting it to most-recently-used. Returns
    /// `None` on a miss or an expired entry (which is evicted as a side
    /// effect of being observed expired).
    pub fn get(&self, key: &str) -> Option<Vec<CachedItem>> {
        let now = Instant::now();

        // Read phase: lookup + copy under a read lock.
        let snapshot = {
            let state = self.state.read();
            let idx = *state.index.get(key)?;
            let entry = state.arena.get(idx).expect("index points at live entry");
            if entry.expiry.is_expired(now) {
                None
            } else {
                Some(entry.content.clone())
            }
        };

        let Some(content) = snapshot else {
            // Expired: drop the read lock's borrow, evict under the write lock.
            let mut state = self.state.write();
            if let Some(&idx) = state.index.get(key) {
                if state
                    .arena
                    .get(idx)
                    .is_some_and(|e| e.expiry.is_expired(Instant::now()))
                {
                    state.remove_index(idx);
                    tracing::debug!(key, "cache entry expired on access");
                }
            }
            return None;
        };

        // Write phase: reorder LRU, double-checking validity.
        {
            let mut state = self.state.write();
            if let Some(&idx) = state.index.get(key) {
                let still_valid = state
                    .arena
                    .get(idx)
                    .is_some_and(|e| !e.expiry.is_expired(Instant::now()));
                if still_valid {
                    state.lru.move_to_front(idx);
                    if let Some(entry) = state.arena.get_mut(idx) {
                        entry.last_accessed = Instant::now();
                    }
                } else {
                    state.remove_index(idx);
                    tracing::debug!(key, "cache entry expired between read and write phase");
                    return None;
                }
            } else {
                return None;
            }
        }

        tracing::debug!(key, "cache hit");
        Some(self.copy_out(&content))
    }

    /// Insert or replace a cache entry. Evicts the least-recently-used
    /// entry first if this would be a *new* key beyond configured capacity.
    pub fn put(&self, key: impl Into<String>, content: Vec<ContentItem>, ttl: Ttl) {
        let key = key.into();
        let now = Instant::now();
        let expiry = self.resolve_expiry(ttl, now);
        let stored: Vec<ContentItem> = content.iter().map(ContentItem::deep_clone).collect();

        let mut state = self.state.write();
        if let Some(&idx) = state.index.get(&key) {
            state.lru.unlink(idx);
            state.arena.remove(idx);
            let new_idx = state.arena.insert(Entry {
                key: key.clone(),
                content: stored,
                expiry,
                last_accessed: now,
            });
            state.index.insert(key, new_idx);
            state.lru.push_front(new_idx);
            return;
        }

        if state.lru.len() >= self.config.capacity {
            if let Some(tail_idx) = state.lru.tail() {
                let evicted = state.remove_index(tail_idx);
                tracing::debug!(key = evicted.key, "evicted LRU entry to make room");
            }
        }

        let idx = state.arena.insert(Entry {
            key: key.clone(),
            content: stored,
            expiry,
            last_accessed: now,
        });
        state.index.insert(key, idx);
        state.lru.push_front(idx);
    }

    /// Remove a single entry, regardless of TTL.
    pub fn invalidate(&self, key: &str) {
        let mut state = self.state.write();
        if let Some(&idx) = state.index.get(key) {
            state.remove_index(idx);
        }
    }

    /// Two-phase prune (spec §4.6): collect expired keys, then remove
    /// them, rechecking expiry at removal time in case a concurrent `put`
    /// refreshed the entry in between.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let candidates: Vec<String> = {
            let state = self.state.read();
            state
                .index
                .iter()
                .filter_map(|(key, &idx)| {
                    state
                        .arena
                        .get(idx)
                        .filter(|e| e.expiry.is_expired(now))
                        .map(|_| key.clone())
                })
                .collect()
        };

        let mut removed = 0;
        let mut state = self.state.write();
        for key in candidates {
            if let Some(&idx) = state.index.get(&key) {
                if state.arena.get(idx).is_some_and(|e| e.expiry.is_expired(Instant::now())) {
                    state.remove_index(idx);
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.read().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
