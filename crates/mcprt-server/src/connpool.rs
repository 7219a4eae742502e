//! Outbound connection pool (spec §4.8): pre-populates `min` connections,
//! grows up to `max` on demand, and a background health-check task closes
//! excess idle connections and reconnects unhealthy ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcprt_transport::{ClientTransport, ClientTransportFactory, TransportError, TransportResult, TransportState};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    pub min: usize,
    pub max: usize,
    pub idle_timeout: Duration,
    pub health_check_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 8,
            idle_timeout: Duration::from_secs(60),
            health_check_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    InUse,
    Invalid,
}

struct Slot {
    conn: Arc<dyn ClientTransport>,
    state: SlotState,
    last_used: Instant,
}

/// `slots` is a free-list arena (same pattern as `mcprt-cache`'s `Arena`):
/// a checked-out connection's index must stay valid across concurrent
/// `release`/`sweep` calls, so a closed slot is tombstoned to `None` and
/// its index recycled via `free` rather than shifted by `Vec::remove`.
struct Inner {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
}

impl Inner {
    fn insert(&mut self, slot: Slot) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn remove(&mut self, idx: usize) -> Option<Slot> {
        let removed = self.slots.get_mut(idx).and_then(Option::take);
        if removed.is_some() {
            self.free.push(idx);
        }
        removed
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn live(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }
}

/// A connection checked out of the pool. Dropping it returns the slot to
/// `Idle` unless [`PooledConnection::mark_unhealthy`] was called first, in
/// which case it becomes `Invalid` for the health-check task to reconnect
/// (spec §4.8 "on healthy → Idle; on unhealthy → Invalid").
pub struct PooledConnection {
    conn: Arc<dyn ClientTransport>,
    index: usize,
    pool: Arc<ConnectionPool>,
    unhealthy: AtomicBool,
}

impl PooledConnection {
    pub fn transport(&self) -> &Arc<dyn ClientTransport> {
        &self.conn
    }

    pub fn mark_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::Release);
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let healthy = !self.unhealthy.load(Ordering::Acquire);
        self.pool.release(self.index, healthy);
    }
}

pub struct ConnectionPool {
    factory: Arc<dyn ClientTransportFactory>,
    transport_config: Value,
    config: ConnectionPoolConfig,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl ConnectionPool {
    /// Creates the pool and pre-populates `config.min` connections, per
    /// spec §4.8.
    pub async fn new(
        factory: Arc<dyn ClientTransportFactory>,
        transport_config: Value,
        config: ConnectionPoolConfig,
    ) -> TransportResult<Arc<Self>> {
        let pool = Arc::new(Self {
            factory,
            transport_config,
            config,
            inner: Mutex::new(Inner { slots: Vec::new(), free: Vec::new() }),
            notify: Notify::new(),
        });

        for _ in 0..pool.config.min {
            let slot = pool.dial().await?;
            pool.inner.lock().insert(slot);
        }
        Ok(pool)
    }

    async fn dial(&self) -> TransportResult<Slot> {
        let conn = self.factory.create(self.transport_config.clone())?;
        tokio::time::timeout(self.config.connect_timeout, conn.connect())
            .await
            .map_err(|_| TransportError::Timeout)??;
        Ok(Slot {
            conn,
            state: SlotState::Idle,
            last_used: Instant::now(),
        })
    }

    /// Acquire an idle connection, creating a new one if under `max`,
    /// else waiting up to `timeout` for a release or new capacity
    /// (spec §4.8 `get(timeout)`).
    pub async fn get(self: &Arc<Self>, timeout: Duration) -> TransportResult<PooledConnection> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(index) = self.try_claim_idle() {
                let conn = self.inner.lock().slots[index]
                    .as_ref()
                    .expect("just-claimed slot is live")
                    .conn
                    .clone();
                return Ok(PooledConnection {
                    conn,
                    index,
                    pool: self.clone(),
                    unhealthy: AtomicBool::new(false),
                });
            }

            let under_max = self.inner.lock().live_count() < self.config.max;
            if under_max {
                let slot = self.dial().await?;
                let mut inner = self.inner.lock();
                let conn = slot.conn.clone();
                let index = inner.insert(Slot {
                    state: SlotState::InUse,
                    ..slot
                });
                return Ok(PooledConnection {
                    conn,
                    index,
                    pool: self.clone(),
                    unhealthy: AtomicBool::new(false),
                });
            }

            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(TransportError::Timeout);
            };
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    fn try_claim_idle(&self) -> Option<usize> {
        let mut inner = self.inner.lock();
        let found = inner
            .slots
            .iter_mut()
            .enumerate()
            .find_map(|(i, s)| s.as_mut().filter(|s| s.state == SlotState::Idle).map(|s| (i, s)));
        if let Some((index, slot)) = found {
            slot.state = SlotState::InUse;
            slot.last_used = Instant::now();
            Some(index)
        } else {
            None
        }
    }

    fn release(&self, index: usize, healthy: bool) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.get_mut(index).and_then(Option::as_mut) {
            slot.state = if healthy { SlotState::Idle } else { SlotState::Invalid };
            slot.last_used = Instant::now();
        }
        drop(inner);
        self.notify.notify_one();
    }

    /// One sweep of the health-check policy (spec §4.8): close idle
    /// connections past `idle_timeout` down to `min`, and reconnect
    /// `Invalid` entries. Returns how many slots were closed/reconnected,
    /// for test observability.
    pub async fn sweep(&self) -> (usize, usize) {
        let now = Instant::now();
        let (to_close, to_reconnect) = {
            let inner = self.inner.lock();
            let idle_count = inner.live().filter(|(_, s)| s.state == SlotState::Idle).count();
            let closeable = idle_count.saturating_sub(self.config.min);
            let mut to_close = Vec::new();
            let mut closed_so_far = 0;
            for (i, slot) in inner.live() {
                if slot.state == SlotState::Idle
                    && closed_so_far < closeable
                    && now.duration_since(slot.last_used) >= self.config.idle_timeout
                {
                    to_close.push(i);
                    closed_so_far += 1;
                }
            }
            let to_reconnect: Vec<usize> = inner
                .live()
                .filter(|(_, s)| s.state == SlotState::Invalid)
                .map(|(i, _)| i)
                .collect();
            (to_close, to_reconnect)
        };

        for &i in &to_reconnect {
            match self.dial().await {
                Ok(slot) => {
                    let mut inner = self.inner.lock();
                    if let Some(existing) = inner.slots.get_mut(i).and_then(Option::as_mut) {
                        *existing = slot;
                    }
                    debug!(slot = i, "connection pool reconnected invalid slot");
                }
                Err(e) => warn!(slot = i, error = %e, "connection pool failed to reconnect invalid slot"),
            }
        }

        {
            let mut inner = self.inner.lock();
            for &i in &to_close {
                inner.remove(i);
            }
        }

        if !to_close.is_empty() || !to_reconnect.is_empty() {
            info!(closed = to_close.len(), reconnected = to_reconnect.len(), "connection pool health check swept");
        }

        (to_close.len(), to_reconnect.len())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the recurring health-check task (spec §5 "one health-check
    /// thread per connection pool"), realised as a Tokio task.
    pub fn spawn_health_check(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = self.clone();
        let interval = pool.config.health_check_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                pool.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use mcprt_transport::{TransportCapabilities, TransportMetrics, TransportType};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct FakeTransport {
        state: Mutex<TransportState>,
    }

    #[async_trait]
    impl ClientTransport for FakeTransport {
        fn transport_type(&self) -> TransportType {
            TransportType::Tcp
        }
        fn capabilities(&self) -> TransportCapabilities {
            TransportCapabilities::default()
        }
        async fn state(&self) -> TransportState {
            self.state.lock().clone()
        }
        async fn connect(&self) -> TransportResult<()> {
            *self.state.lock() = TransportState::Connected;
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            *self.state.lock() = TransportState::Disconnected;
            Ok(())
        }
        async fn send(&self, _payload: Bytes) -> TransportResult<()> {
            Ok(())
        }
        async fn receive(&self, _timeout: Option<Duration>) -> TransportResult<Option<Bytes>> {
            Ok(None)
        }
        async fn metrics(&self) -> TransportMetrics {
            TransportMetrics::default()
        }
    }

    #[derive(Debug)]
    struct FakeFactory {
        created: AtomicUsize,
    }

    impl ClientTransportFactory for FakeFactory {
        fn transport_type(&self) -> TransportType {
            TransportType::Tcp
        }
        fn create(&self, _config: Value) -> TransportResult<Arc<dyn ClientTransport>> {
            self.created.fetch_add(1, Ordering::Relaxed);
            Ok(Arc::new(FakeTransport {
                state: Mutex::new(TransportState::Disconnected),
            }))
        }
    }

    fn factory() -> Arc<FakeFactory> {
        Arc::new(FakeFactory {
            created: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn pre_populates_min_connections() {
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 3,
                max: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn get_reuses_idle_then_grows_to_max() {
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 1,
                max: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let a = pool.get(Duration::from_millis(100)).await.unwrap();
        assert_eq!(pool.len(), 1);
        let b = pool.get(Duration::from_millis(100)).await.unwrap();
        assert_eq!(pool.len(), 2);
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn get_times_out_when_pool_exhausted() {
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 1,
                max: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let _held = pool.get(Duration::from_millis(50)).await.unwrap();
        let err = pool.get(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[tokio::test]
    async fn release_marks_unhealthy_connection_invalid() {
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 1,
                max: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let conn = pool.get(Duration::from_millis(50)).await.unwrap();
        conn.mark_unhealthy();
        drop(conn);

        let (_, reconnected) = pool.sweep().await;
        assert_eq!(reconnected, 1);
    }

    #[tokio::test]
    async fn sweep_closes_idle_connections_above_min() {
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 1,
                max: 3,
                idle_timeout: Duration::from_millis(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let a = pool.get(Duration::from_millis(50)).await.unwrap();
        let b = pool.get(Duration::from_millis(50)).await.unwrap();
        drop(a);
        drop(b);

        let (closed, _) = pool.sweep().await;
        assert_eq!(closed, 1);
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn sweeping_an_earlier_idle_slot_does_not_corrupt_a_later_checkout() {
        // Regression: slot indices must stay stable across `sweep()`, or a
        // live `PooledConnection`'s stored index points at the wrong slot
        // (or none) once an earlier slot is closed out from under it.
        let pool = ConnectionPool::new(
            factory(),
            Value::Null,
            ConnectionPoolConfig {
                min: 0,
                max: 3,
                idle_timeout: Duration::from_millis(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let a = pool.get(Duration::from_millis(50)).await.unwrap();
        let b = pool.get(Duration::from_millis(50)).await.unwrap();
        let c = pool.get(Duration::from_millis(50)).await.unwrap();
        drop(a);

        let (closed, _) = pool.sweep().await;
        assert_eq!(closed, 1);
        assert_eq!(pool.len(), 2);

        // b and c must still release into their own slots, not each
        // other's (or a now-removed one).
        drop(b);
        drop(c);
        assert_eq!(pool.len(), 2);

        // Both surviving slots must be independently reusable.
        let d = pool.get(Duration::from_millis(50)).await.unwrap();
        let e = pool.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(pool.len(), 2);
        drop(d);
        drop(e);
    }
}
