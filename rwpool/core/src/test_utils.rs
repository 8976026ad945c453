//! Mock Driver for Tests
//!
//! Provides an in-memory [`Driver`] that records every connect, close and
//! statement, and can simulate connect failures, slow handshakes, statement
//! errors and lost sessions.
//!
//! Statement behaviour is keyed on the SQL text:
//! - `FAIL ...` returns [`MockError::Statement`]
//! - `DROP connection` returns [`MockError::ConnectionLost`]
//! - anything else succeeds with a [`MockRows`]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::driver::Driver;
use crate::endpoint::Endpoint;

/// Endpoint with test credentials on the given port
pub fn test_endpoint(port: u16) -> Endpoint {
    Endpoint {
        host: "127.0.0.1".to_string(),
        port,
        database: "test".to_string(),
        username: "tester".to_string(),
        password: "secret".to_string(),
        connect_timeout: Duration::from_secs(2),
        idle_timeout: Duration::from_secs(2),
    }
}

/// Errors produced by [`MockDriver`]
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Injected through [`MockDriver::fail_next_connects`]
    #[error("connection refused")]
    ConnectRefused,
    /// Connect exceeded the endpoint's connect timeout
    #[error("connect timed out")]
    ConnectTimeout,
    /// Statement text started with `FAIL`
    #[error("statement failed: {0}")]
    Statement(String),
    /// Statement was `DROP connection`
    #[error("connection lost")]
    ConnectionLost,
}

/// Session handle; ids count up from 1 per driver
#[derive(Debug)]
pub struct MockSession {
    /// Connect sequence number
    pub id: usize,
    /// Port of the endpoint it was opened against
    pub port: u16,
}

/// Result of a mock statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockRows {
    /// Id of the session that ran the statement
    pub session: usize,
    /// Port of that session's endpoint
    pub port: u16,
    /// Statement text as received
    pub sql: String,
}

/// Recording driver with failure injection
pub struct MockDriver {
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing_connects: AtomicUsize,
    connect_delay: Mutex<Duration>,
    executed: Mutex<Vec<String>>,
    gate: Option<Semaphore>,
}

impl MockDriver {
    /// Driver whose statements complete immediately
    pub fn new() -> Self {
        Self {
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            failing_connects: AtomicUsize::new(0),
            connect_delay: Mutex::new(Duration::ZERO),
            executed: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Driver whose statements wait until [`release`](Self::release) is called
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Let `n` waiting (or future) statements complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Make the next `n` connects fail
    pub fn fail_next_connects(&self, n: usize) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Delay every connect by `delay`
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    /// Connect attempts so far, failed ones included
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sessions closed through the driver
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Session = MockSession;
    type ResultSet = MockRows;
    type Error = MockError;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MockSession, MockError> {
        let delay = *self.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let id = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_connects.store(failing - 1, Ordering::SeqCst);
            return Err(MockError::ConnectRefused);
        }

        Ok(MockSession {
            id,
            port: endpoint.port,
        })
    }

    async fn execute(&self, session: &mut MockSession, sql: &str) -> Result<MockRows, MockError> {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.executed.lock().unwrap().push(sql.to_string());

        if sql.starts_with("FAIL") {
            return Err(MockError::Statement(sql.to_string()));
        }
        if sql == "DROP connection" {
            return Err(MockError::ConnectionLost);
        }

        Ok(MockRows {
            session: session.id,
            port: session.port,
            sql: sql.to_string(),
        })
    }

    async fn close(&self, _session: MockSession) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn connect_timeout_error(&self, _endpoint: &Endpoint) -> MockError {
        MockError::ConnectTimeout
    }

    fn is_disconnect(&self, error: &MockError) -> bool {
        matches!(error, MockError::ConnectionLost)
    }
}
