//! Connection Workers
//!
//! A [`ConnectionWorker`] pairs one [`LazyConnection`] with a counter of the
//! statements currently outstanding on it. The router reads the counter to
//! pick the least busy worker.
//!
//! # Job accounting
//!
//! [`ConnectionWorker::query`] bumps the counter before it returns, so a
//! selection that runs right after the call already sees the new job. The
//! matching decrement lives in a [`JobGuard`] moved into the returned future;
//! it runs exactly once whether the statement succeeds, fails, or the future
//! is dropped unfinished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::connection::LazyConnection;
use crate::driver::Driver;

/// Future returned for a dispatched statement
pub type QueryFuture<D> =
    BoxFuture<'static, Result<<D as Driver>::ResultSet, <D as Driver>::Error>>;

/// One lazy connection plus its outstanding-job counter
pub struct ConnectionWorker<D: Driver> {
    index: usize,
    connection: Arc<LazyConnection<D>>,
    jobs: Arc<AtomicUsize>,
}

impl<D: Driver> ConnectionWorker<D> {
    /// Wrap a connection as the worker at `index` of its pool
    #[must_use]
    pub fn new(index: usize, connection: LazyConnection<D>) -> Self {
        Self {
            index,
            connection: Arc::new(connection),
            jobs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Position of this worker in its pool
    pub fn index(&self) -> usize {
        self.index
    }

    /// Statements dispatched to this worker and not yet settled
    pub fn jobs(&self) -> usize {
        self.jobs.load(Ordering::Acquire)
    }

    /// The underlying lazy connection
    pub fn connection(&self) -> &LazyConnection<D> {
        &self.connection
    }

    /// Dispatch a statement to this worker
    ///
    /// The job is counted before this returns. The statement itself runs
    /// when the future is polled.
    pub fn query(&self, sql: impl Into<String>) -> QueryFuture<D> {
        let guard = JobGuard::acquire(Arc::clone(&self.jobs));
        let connection = Arc::clone(&self.connection);
        let sql = sql.into();

        Box::pin(async move {
            let _guard = guard;
            connection.query(&sql).await
        })
    }
}

/// Counts one outstanding job for as long as it lives (RAII guard)
#[derive(Debug)]
pub struct JobGuard {
    jobs: Arc<AtomicUsize>,
}

impl JobGuard {
    fn acquire(jobs: Arc<AtomicUsize>) -> Self {
        jobs.fetch_add(1, Ordering::AcqRel);
        Self { jobs }
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.jobs.fetch_sub(1, Ordering::AcqRel);
    }
}
