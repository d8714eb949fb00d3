//! Connection Pool & Thread-Safe Graph Handle (spec §4.5).
//!
//! A bounded, per-database-path pool of substrate connections. `acquire` and
//! `release` are cooperative async entry points; the underlying substrate
//! drivers (sqlite, lancedb, kuzu) are blocking and are expected to be
//! invoked via `tokio::task::spawn_blocking` by the adapters that sit above
//! this pool.

mod graph_handle;
mod stats;

pub use graph_handle::ThreadSafeGraphHandle;
pub use stats::PoolStats;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};

use crate::error::{GrizabellaError, Result};

/// A factory for new connections plus a liveness check, implemented once per
/// substrate (relational, vector, graph).
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn create(&self) -> Result<Self::Connection>;

    /// Whether `conn` is still usable. A failing check causes the pool to
    /// discard and replace the connection.
    async fn is_alive(&self, conn: &Self::Connection) -> bool;
}

struct Idle<C> {
    conn: C,
    since: Instant,
}

struct Inner<C> {
    idle: VecDeque<Idle<C>>,
    in_use: usize,
    bypass_count: usize,
    shutting_down: bool,
}

/// A pooled connection handle. Dropping it without calling
/// [`ConnectionPool::release`] is a caller bug the pool cannot detect; the
/// public API always pairs `acquire` with a `release` in a `finally`-style
/// block at the call site.
pub struct PooledConnection<C> {
    pub connection: C,
    /// `true` when this connection was created outside the bounded pool
    /// because capacity was exceeded; such connections are closed on release
    /// rather than returned to the idle list.
    pub bypass: bool,
}

/// Bounded pool of connections to one substrate for one database path.
pub struct ConnectionPool<F: ConnectionFactory> {
    factory: F,
    max_idle: usize,
    max_idle_time: Duration,
    acquire_timeout: Duration,
    inner: Mutex<Inner<F::Connection>>,
    notify: Notify,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(factory: F, max_idle: usize, max_idle_time: Duration, acquire_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            factory,
            max_idle,
            max_idle_time,
            acquire_timeout,
            inner: Mutex::new(Inner {
                idle: VecDeque::new(),
                in_use: 0,
                bypass_count: 0,
                shutting_down: false,
            }),
            notify: Notify::new(),
        })
    }

    /// Acquire a connection: reuse an idle one, create a fresh one if under
    /// capacity, wait for a release, or (once capacity and waiters both
    /// saturate) hand out a bypass connection closed on release.
    pub async fn acquire(&self) -> Result<PooledConnection<F::Connection>> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            {
                let mut inner = self.inner.lock().await;
                if inner.shutting_down {
                    return Err(GrizabellaError::Database(
                        "pool is shutting down".to_string(),
                    ));
                }

                while let Some(idle) = inner.idle.pop_front() {
                    if self.factory.is_alive(&idle.conn).await {
                        inner.in_use += 1;
                        return Ok(PooledConnection {
                            connection: idle.conn,
                            bypass: false,
                        });
                    }
                    // Liveness check failed; drop it and try the next idle slot.
                }

                if inner.in_use < self.max_idle {
                    inner.in_use += 1;
                    drop(inner);
                    let conn = self.factory.create().await?;
                    return Ok(PooledConnection {
                        connection: conn,
                        bypass: false,
                    });
                }
            }

            if Instant::now() >= deadline {
                // Capacity exceeded and no waiter slot freed up in time:
                // hand out an observable bypass connection.
                let mut inner = self.inner.lock().await;
                inner.bypass_count += 1;
                drop(inner);
                let conn = self.factory.create().await?;
                return Ok(PooledConnection {
                    connection: conn,
                    bypass: true,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    /// Return a connection to the pool, or close it if it was a bypass
    /// connection.
    pub async fn release(&self, pooled: PooledConnection<F::Connection>) {
        let mut inner = self.inner.lock().await;
        if pooled.bypass {
            inner.bypass_count = inner.bypass_count.saturating_sub(1);
        } else {
            inner.in_use = inner.in_use.saturating_sub(1);
            inner.idle.push_back(Idle {
                conn: pooled.connection,
                since: Instant::now(),
            });
        }
        drop(inner);
        self.notify.notify_one();
    }

    /// Evict idle connections that have been unused longer than
    /// `max_idle_time`. Intended to be driven by a background task or the
    /// Resource Monitor.
    pub async fn evict_idle(&self) {
        let mut inner = self.inner.lock().await;
        let cutoff = Instant::now() - self.max_idle_time;
        inner.idle.retain(|idle| idle.since > cutoff);
    }

    pub async fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().await;
        PoolStats {
            idle: inner.idle.len(),
            in_use: inner.in_use,
            bypass_count: inner.bypass_count,
            max_connections: self.max_idle,
        }
    }

    /// Shut down the pool: no further `acquire` calls are serviced.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.shutting_down = true;
        inner.idle.clear();
        drop(inner);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        created: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ConnectionFactory for CountingFactory {
        type Connection = usize;

        async fn create(&self) -> Result<Self::Connection> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        async fn is_alive(&self, _conn: &Self::Connection) -> bool {
            true
        }
    }

    fn factory() -> CountingFactory {
        CountingFactory {
            created: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn acquire_then_release_reuses_connection() {
        let pool = ConnectionPool::new(factory(), 2, Duration::from_secs(1), Duration::from_millis(200));
        let conn = pool.acquire().await.unwrap();
        let id = conn.connection;
        pool.release(conn).await;

        let conn2 = pool.acquire().await.unwrap();
        assert_eq!(conn2.connection, id);
        assert!(!conn2.bypass);
    }

    #[tokio::test]
    async fn capacity_exceeded_yields_bypass_connection() {
        let pool = ConnectionPool::new(factory(), 1, Duration::from_secs(1), Duration::from_millis(50));
        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert!(second.bypass);

        let stats = pool.stats().await;
        assert_eq!(stats.bypass_count, 1);
        assert_eq!(stats.in_use, 1);

        pool.release(first).await;
        pool.release(second).await;
        let stats = pool.stats().await;
        assert_eq!(stats.bypass_count, 0);
    }

    #[tokio::test]
    async fn in_use_plus_idle_never_exceeds_capacity_plus_bypass() {
        let pool = ConnectionPool::new(factory(), 3, Duration::from_secs(1), Duration::from_millis(50));
        let mut held = Vec::new();
        for _ in 0..3 {
            held.push(pool.acquire().await.unwrap());
        }
        let bypass = pool.acquire().await.unwrap();
        assert!(bypass.bypass);

        let stats = pool.stats().await;
        assert!(stats.in_use + stats.idle <= stats.max_connections + stats.bypass_count);

        for conn in held {
            pool.release(conn).await;
        }
        pool.release(bypass).await;
    }

    #[tokio::test]
    async fn shutdown_rejects_new_acquires() {
        let pool = ConnectionPool::new(factory(), 2, Duration::from_secs(1), Duration::from_millis(50));
        pool.shutdown().await;
        assert!(pool.acquire().await.is_err());
    }
}
