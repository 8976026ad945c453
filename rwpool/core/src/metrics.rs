//! Router Metrics
//!
//! Lock-free counters for the routing layer:
//! - Statements routed per pool
//! - Statements settled successfully / with a driver error
//! - Dispatch-to-settlement latency
//!
//! Live per-worker load is not duplicated here; read it from
//! [`Router::job_counts`](crate::Router::job_counts).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::query::QueryKind;

// ============================================================================
// Counter
// ============================================================================

/// A monotonically increasing counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Histogram
// ============================================================================

/// Latency histogram with fixed millisecond buckets
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<u64>,
    counts: Vec<AtomicU64>,
    total_count: AtomicU64,
    sum: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Histogram with the given upper bucket bounds (ms, ascending)
    pub fn new(buckets: Vec<u64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            total_count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Buckets suited to database round trips
    pub fn latency_default() -> Self {
        Self::new(vec![1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000])
    }

    /// Record one observation; values beyond the last bound land in it
    pub fn record(&self, value: Duration) {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        let bucket = self
            .buckets
            .iter()
            .position(|&b| ms <= b)
            .unwrap_or(self.buckets.len().saturating_sub(1));

        if let Some(count) = self.counts.get(bucket) {
            count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> HistogramSnapshot {
        let total = self.total_count.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        HistogramSnapshot {
            buckets: self.buckets.clone(),
            counts: self
                .counts
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            total,
            max: self.max.load(Ordering::Relaxed),
            mean: if total > 0 {
                sum as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of histogram data
#[derive(Clone, Debug, Serialize)]
pub struct HistogramSnapshot {
    /// Upper bucket bounds (ms)
    pub buckets: Vec<u64>,
    /// Observations per bucket
    pub counts: Vec<u64>,
    /// Total observations
    pub total: u64,
    /// Largest observation (ms)
    pub max: u64,
    /// Mean observation (ms)
    pub mean: f64,
}

// ============================================================================
// Router Metrics
// ============================================================================

/// Counters maintained by the router
#[derive(Debug)]
pub struct RouterMetrics {
    /// Statements sent to the read pool
    pub reads_routed: Counter,
    /// Statements sent to the write pool
    pub writes_routed: Counter,
    /// Statements that settled with a result
    pub succeeded: Counter,
    /// Statements that settled with a driver error
    pub failed: Counter,
    /// Time from dispatch to settlement
    pub latency: Histogram,
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self {
            reads_routed: Counter::new(),
            writes_routed: Counter::new(),
            succeeded: Counter::new(),
            failed: Counter::new(),
            latency: Histogram::latency_default(),
        }
    }
}

impl RouterMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a dispatched statement
    pub fn record_routed(&self, kind: QueryKind) {
        match kind {
            QueryKind::Read => self.reads_routed.inc(),
            QueryKind::Write => self.writes_routed.inc(),
        }
    }

    /// Count a settled statement
    pub fn record_settled(&self, ok: bool, elapsed: Duration) {
        if ok {
            self.succeeded.inc();
        } else {
            self.failed.inc();
        }
        self.latency.record(elapsed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads_routed: self.reads_routed.get(),
            writes_routed: self.writes_routed.get(),
            succeeded: self.succeeded.get(),
            failed: self.failed.get(),
            latency: self.latency.snapshot(),
        }
    }
}

/// Serializable copy of [`RouterMetrics`]
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    /// Statements sent to the read pool
    pub reads_routed: u64,
    /// Statements sent to the write pool
    pub writes_routed: u64,
    /// Statements that settled with a result
    pub succeeded: u64,
    /// Statements that settled with a driver error
    pub failed: u64,
    /// Dispatch-to-settlement latency
    pub latency: HistogramSnapshot,
}
