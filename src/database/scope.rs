use futures::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::manager::StorageError;

/// Acquire/release counters for the pool owned by a [`ConnectionScope`]
#[derive(Debug, Default)]
pub struct ScopeStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl ScopeStats {
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Leases currently held by units of work
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// One pooled connection owned by a single unit of work.
///
/// Returning the connection to the pool happens in `Drop`, so every exit
/// path (success, error, or the owning future being cancelled) releases it
/// exactly once.
pub struct ConnectionLease {
    conn: PoolConnection<Sqlite>,
    stats: Arc<ScopeStats>,
}

impl ConnectionLease {
    fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Released pooled connection");
    }
}

/// Runs units of work against one pooled connection each
#[derive(Clone)]
pub struct ConnectionScope {
    pool: SqlitePool,
    stats: Arc<ScopeStats>,
}

impl ConnectionScope {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            stats: Arc::new(ScopeStats::default()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn stats(&self) -> Arc<ScopeStats> {
        self.stats.clone()
    }

    async fn acquire(&self) -> Result<ConnectionLease, StorageError> {
        // Suspends while the pool is at capacity, bounded by the acquire timeout
        let conn = self.pool.acquire().await?;
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionLease {
            conn,
            stats: self.stats.clone(),
        })
    }

    /// Run `work` with a leased connection; the lease is gone before this returns
    pub async fn with_connection<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let mut lease = self.acquire().await?;
        let outcome = work(lease.connection()).await;
        drop(lease);
        outcome.map_err(StorageError::from)
    }
}
