//! Query Router
//!
//! The entry point for all statements. Owns the write pool and the read
//! pool, classifies each statement, and hands it to the least busy worker of
//! the matching pool.
//!
//! # Usage
//!
//! ```ignore
//! let router = Router::new(config, MySqlDriver::new())?;
//!
//! let rows = router.query("SELECT id FROM users")?.await?;
//! router.query("UPDATE users SET seen = NOW() WHERE id = 7")?.await?;
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --create_pools--> Initialized
//!       |                              |
//!   query / best_connections       create_pools
//!       v                              v
//!  PoolNotInitialized            PoolAlreadyCreated
//! ```

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::config::RouterConfig;
use crate::driver::Driver;
use crate::metrics::{MetricsSnapshot, RouterMetrics};
use crate::pool::ConnectionPool;
use crate::query::QueryKind;
use crate::worker::{ConnectionWorker, QueryFuture};

// ============================================================================
// Selection Result
// ============================================================================

/// Least loaded worker index of each pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestConnections {
    /// Index into the write pool
    pub write: usize,
    /// Index into the read pool
    pub read: usize,
}

impl BestConnections {
    /// Index to use for a statement of `kind`
    #[must_use]
    pub fn for_kind(&self, kind: QueryKind) -> usize {
        match kind {
            QueryKind::Read => self.read,
            QueryKind::Write => self.write,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Read/write split router over two pools of lazy connections
pub struct Router<D: Driver> {
    config: RouterConfig,
    driver: Arc<D>,
    write_pool: ConnectionPool<D>,
    read_pool: ConnectionPool<D>,
    metrics: Arc<RouterMetrics>,
}

impl<D: Driver> Router<D> {
    /// Create a router and build both pools
    ///
    /// Sessions are opened lazily, so this does no network I/O. The config
    /// is used as given; call [`RouterConfig::validate`] first to reject
    /// empty pools up front.
    ///
    /// # Errors
    ///
    /// Propagates [`Router::create_pools`] errors.
    pub fn new(config: RouterConfig, driver: D) -> Result<Self, RouterError> {
        let mut router = Self::uninitialized(config, driver);
        router.create_pools()?;
        Ok(router)
    }

    /// Create a router whose pools are still empty
    #[must_use]
    pub fn uninitialized(config: RouterConfig, driver: D) -> Self {
        Self {
            config,
            driver: Arc::new(driver),
            write_pool: ConnectionPool::empty(QueryKind::Write),
            read_pool: ConnectionPool::empty(QueryKind::Read),
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Build the configured number of workers for each pool
    ///
    /// # Errors
    ///
    /// [`RouterError::PoolAlreadyCreated`] if either pool already holds
    /// workers.
    pub fn create_pools(&mut self) -> Result<&mut Self, RouterError> {
        if !self.write_pool.is_empty() || !self.read_pool.is_empty() {
            return Err(RouterError::PoolAlreadyCreated);
        }

        self.write_pool = ConnectionPool::build(
            QueryKind::Write,
            &self.driver,
            self.config.write_endpoint(),
            self.config.write_instances,
        );
        self.read_pool = ConnectionPool::build(
            QueryKind::Read,
            &self.driver,
            self.config.read_endpoint(),
            self.config.read_instances,
        );

        Ok(self)
    }

    /// Whether both pools hold workers
    pub fn is_initialized(&self) -> bool {
        !self.write_pool.is_empty() && !self.read_pool.is_empty()
    }

    /// Configuration the pools were built from
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Pool serving statements of `kind`
    pub fn pool(&self, kind: QueryKind) -> &ConnectionPool<D> {
        match kind {
            QueryKind::Read => &self.read_pool,
            QueryKind::Write => &self.write_pool,
        }
    }

    /// Worker at `index` of the pool serving `kind`
    pub fn worker(&self, kind: QueryKind, index: usize) -> Option<&ConnectionWorker<D>> {
        self.pool(kind).get(index)
    }

    /// Live outstanding-job counts of the pool serving `kind`
    pub fn job_counts(&self, kind: QueryKind) -> Vec<usize> {
        self.pool(kind).job_counts()
    }

    /// Snapshot of routing metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Least loaded worker of both pools
    ///
    /// Both pools are scanned on every call, whichever one the caller needs.
    ///
    /// # Errors
    ///
    /// [`RouterError::PoolNotInitialized`] if either pool is empty.
    pub fn best_connections(&self) -> Result<BestConnections, RouterError> {
        match (self.write_pool.least_loaded(), self.read_pool.least_loaded()) {
            (Some(write), Some(read)) => Ok(BestConnections { write, read }),
            _ => Err(RouterError::PoolNotInitialized),
        }
    }

    /// Route a statement to the least busy worker of its pool
    ///
    /// The job is counted on the chosen worker before this returns, so
    /// consecutive calls see each other's load. The returned future yields
    /// the driver's result or error unchanged.
    ///
    /// # Errors
    ///
    /// [`RouterError::PoolNotInitialized`] before the pools exist,
    /// [`RouterError::CorruptedPoolEntry`] if the selected slot is missing.
    pub fn query(&self, sql: impl Into<String>) -> Result<QueryFuture<D>, RouterError> {
        let sql = sql.into();
        let kind = QueryKind::classify(&sql);
        let index = self.best_connections()?.for_kind(kind);

        let worker = self
            .worker(kind, index)
            .ok_or(RouterError::CorruptedPoolEntry { kind, index })?;

        let pending = worker.query(sql);
        self.metrics.record_routed(kind);
        debug!(pool = %kind, worker = index, jobs = worker.jobs(), "Dispatched query");

        let metrics = Arc::clone(&self.metrics);
        let dispatched_at = Instant::now();
        Ok(Box::pin(async move {
            let result = pending.await;
            metrics.record_settled(result.is_ok(), dispatched_at.elapsed());
            result
        }))
    }

    /// Handle for higher-level query construction bound to this router
    ///
    /// # Errors
    ///
    /// [`RouterError::PoolNotInitialized`] if either pool is empty.
    pub fn query_builder(&self) -> Result<QueryBuilder<'_, D>, RouterError> {
        if !self.is_initialized() {
            return Err(RouterError::PoolNotInitialized);
        }
        Ok(QueryBuilder { router: self })
    }

    /// Close every open session
    ///
    /// Workers stay in place; the next statement on a worker reconnects.
    pub async fn disconnect_all(&self) {
        for worker in self.write_pool.workers().iter().chain(self.read_pool.workers()) {
            worker.connection().disconnect().await;
        }
        tracing::info!("Closed all pool sessions");
    }
}

// ============================================================================
// Query Builder Handle
// ============================================================================

/// Router handle given to query-construction layers
pub struct QueryBuilder<'a, D: Driver> {
    router: &'a Router<D>,
}

impl<'a, D: Driver> QueryBuilder<'a, D> {
    /// Run a finished statement through the router
    ///
    /// # Errors
    ///
    /// Same as [`Router::query`].
    pub fn query(&self, sql: impl Into<String>) -> Result<QueryFuture<D>, RouterError> {
        self.router.query(sql)
    }

    /// The router this handle is bound to
    pub fn router(&self) -> &'a Router<D> {
        self.router
    }
}

// ============================================================================
// Router Errors
// ============================================================================

/// Errors raised by the routing layer itself
///
/// Driver failures are not wrapped here; they arrive through the query
/// future as the driver's own error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Pool creation ran while pools already hold workers
    #[error("Connections already created")]
    PoolAlreadyCreated,

    /// Routing was attempted before both pools hold workers
    #[error("Connections not created")]
    PoolNotInitialized,

    /// The selected pool slot holds no worker; restart the process
    #[error("No worker at {kind} pool index {index}, restart required")]
    CorruptedPoolEntry {
        /// Pool that was selected
        kind: QueryKind,
        /// Slot that was selected
        index: usize,
    },
}

// ============================================================================
// Tests
// ============================================================================
