//! Receive-scratch-space buffer pool (spec §4.7 "Buffer pool is a
//! specialisation for large byte buffers"), grounded on
//! `turbomcp-protocol::zero_copy::BufferPool` — the same pre-allocate /
//! pop-or-allocate / clear-and-return shape, with the free list held in a
//! `parking_lot::Mutex<Vec<_>>` rather than a `crossbeam::ArrayQueue` so
//! this crate doesn't need an extra dependency the rest of the workspace
//! doesn't otherwise use.

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::stats::{PoolCounters, PoolStats};

/// A pool of reusable [`BytesMut`] scratch buffers, sized for transport
/// receive loops (spec §4.3 TCP read buffers, §4.2 SSE flush buffers).
#[derive(Debug)]
pub struct BufferPool {
    capacity: usize,
    max_buffers: usize,
    free: Mutex<Vec<BytesMut>>,
    counters: PoolCounters,
}

impl BufferPool {
    /// Pre-populate `initial` buffers of `capacity` bytes; `max_buffers`
    /// bounds how many are retained on release (extra releases are
    /// dropped rather than grown without bound).
    pub fn new(initial: usize, capacity: usize, max_buffers: usize) -> Self {
        let free = (0..initial).map(|_| BytesMut::with_capacity(capacity)).collect();
        let pool = Self {
            capacity,
            max_buffers,
            free: Mutex::new(free),
            counters: PoolCounters::default(),
        };
        for _ in 0..initial {
            pool.counters.record_acquire(true);
            pool.counters.record_release();
        }
        pool
    }

    /// Acquire a cleared buffer of at least `capacity` bytes, reusing a
    /// freed one if available.
    pub fn acquire(&self) -> BufferGuard<'_> {
        let mut free = self.free.lock();
        let (buf, created_new) = match free.pop() {
            Some(buf) => (buf, false),
            None => (BytesMut::with_capacity(self.capacity), true),
        };
        drop(free);
        self.counters.record_acquire(created_new);
        BufferGuard {
            pool: self,
            buf: Some(buf),
        }
    }

    fn release(&self, mut buf: BytesMut) {
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_buffers {
            free.push(buf);
        }
        drop(free);
        self.counters.record_release();
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.free.lock().len())
    }
}

/// A buffer on loan from a [`BufferPool`]; cleared and returned on drop.
pub struct BufferGuard<'a> {
    pool: &'a BufferPool,
    buf: Option<BytesMut>,
}

impl std::ops::Deref for BufferGuard<'_> {
    type Target = BytesMut;
    fn deref(&self) -> &BytesMut {
        self.buf.as_ref().expect("BufferGuard taken before drop")
    }
}

impl std::ops::DerefMut for BufferGuard<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        self.buf.as_mut().expect("BufferGuard taken before drop")
    }
}

impl Drop for BufferGuard<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
