//! Connection Pools
//!
//! A [`ConnectionPool`] is a fixed, ordered set of [`ConnectionWorker`]s that
//! all point at the same endpoint. Its size is decided when it is built and
//! never changes afterwards.

use std::sync::Arc;

use tracing::info;

use crate::connection::LazyConnection;
use crate::driver::Driver;
use crate::endpoint::Endpoint;
use crate::query::QueryKind;
use crate::worker::ConnectionWorker;

/// Index of the lowest value, first occurrence on ties
///
/// A later value only replaces the recorded minimum when it is strictly
/// lower, so the earliest index wins among equals.
pub fn least_loaded_index(counts: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, jobs) in counts.into_iter().enumerate() {
        if best.map_or(true, |(_, min)| jobs < min) {
            best = Some((index, jobs));
        }
    }
    best.map(|(index, _)| index)
}

/// Fixed-size set of workers for one side of the read/write split
pub struct ConnectionPool<D: Driver> {
    kind: QueryKind,
    workers: Vec<ConnectionWorker<D>>,
}

impl<D: Driver> ConnectionPool<D> {
    /// A pool with no workers
    #[must_use]
    pub fn empty(kind: QueryKind) -> Self {
        Self {
            kind,
            workers: Vec::new(),
        }
    }

    /// Build `size` workers with lazy connections to `endpoint`
    ///
    /// No session is opened here.
    #[must_use]
    pub fn build(kind: QueryKind, driver: &Arc<D>, endpoint: Endpoint, size: usize) -> Self {
        let endpoint = Arc::new(endpoint);
        let workers = (0..size)
            .map(|index| {
                let connection = LazyConnection::new(Arc::clone(driver), Arc::clone(&endpoint));
                ConnectionWorker::new(index, connection)
            })
            .collect();

        info!(pool = %kind, size, endpoint = %endpoint, "Created connection pool");

        Self { kind, workers }
    }

    /// Which side of the split this pool serves
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool holds no workers
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Worker at `index`
    pub fn get(&self, index: usize) -> Option<&ConnectionWorker<D>> {
        self.workers.get(index)
    }

    /// All workers in index order
    pub fn workers(&self) -> &[ConnectionWorker<D>] {
        &self.workers
    }

    /// Live outstanding-job count of every worker, in index order
    pub fn job_counts(&self) -> Vec<usize> {
        self.workers.iter().map(ConnectionWorker::jobs).collect()
    }

    /// Index of the worker with the fewest outstanding jobs
    ///
    /// Returns `None` for an empty pool.
    pub fn least_loaded(&self) -> Option<usize> {
        least_loaded_index(self.workers.iter().map(ConnectionWorker::jobs))
    }
}
