//! Lazy Connections
//!
//! A [`LazyConnection`] owns at most one driver session. Nothing touches the
//! network until the first statement arrives; the session is then kept open
//! and reused by every following statement.
//!
//! # Session lifecycle
//!
//! ```text
//!   (none) --query--> connect --ok--> (open) --query--> execute
//!      ^                  |             |  |
//!      |                err/timeout     |  +-- idle timeout elapsed --> close --> (none)
//!      +------------------+             +----- disconnect error ------------------> (none)
//! ```
//!
//! Statements on one connection run one after another; the async mutex
//! around the session queues them in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::driver::Driver;
use crate::endpoint::Endpoint;

struct OpenSession<S> {
    session: S,
    last_used: Instant,
}

/// A connection whose session is established on first use
pub struct LazyConnection<D: Driver> {
    driver: Arc<D>,
    endpoint: Arc<Endpoint>,
    session: Mutex<Option<OpenSession<D::Session>>>,
    connected: AtomicBool,
}

impl<D: Driver> LazyConnection<D> {
    /// Create a connection handle; no session is opened yet
    #[must_use]
    pub fn new(driver: Arc<D>, endpoint: Arc<Endpoint>) -> Self {
        Self {
            driver,
            endpoint,
            session: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Endpoint this connection talks to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Run a statement, opening (or re-opening) the session if needed
    ///
    /// Driver errors are returned exactly as the driver produced them.
    pub async fn query(&self, sql: &str) -> Result<D::ResultSet, D::Error> {
        let mut slot = self.session.lock().await;

        let current = match slot.take() {
            Some(open) if self.is_idle(&open) => {
                debug!(endpoint = %self.endpoint, "Closing idle session");
                self.connected.store(false, Ordering::Release);
                self.driver.close(open.session).await;
                None
            }
            other => other,
        };

        let open = match current {
            Some(open) => slot.insert(open),
            None => slot.insert(self.open().await?),
        };

        let result = self.driver.execute(&mut open.session, sql).await;
        open.last_used = Instant::now();

        if let Err(e) = &result {
            if self.driver.is_disconnect(e) {
                warn!(endpoint = %self.endpoint, error = %e, "Session lost, will reconnect on next query");
                *slot = None;
                self.connected.store(false, Ordering::Release);
            }
        }

        result
    }

    /// Close the session if one is open
    pub async fn disconnect(&self) {
        let mut slot = self.session.lock().await;
        if let Some(open) = slot.take() {
            self.connected.store(false, Ordering::Release);
            self.driver.close(open.session).await;
            debug!(endpoint = %self.endpoint, "Session closed");
        }
    }

    // A zero idle timeout keeps sessions open indefinitely.
    fn is_idle(&self, open: &OpenSession<D::Session>) -> bool {
        let idle = self.endpoint.idle_timeout;
        !idle.is_zero() && open.last_used.elapsed() >= idle
    }

    async fn open(&self) -> Result<OpenSession<D::Session>, D::Error> {
        debug!(endpoint = %self.endpoint, "Opening session");

        let timeout = self.endpoint.connect_timeout;
        let connecting = self.driver.connect(&self.endpoint);
        let outcome = if timeout.is_zero() {
            connecting.await
        } else {
            match tokio::time::timeout(timeout, connecting).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(endpoint = %self.endpoint, ?timeout, "Timed out opening session");
                    return Err(self.driver.connect_timeout_error(&self.endpoint));
                }
            }
        };

        match outcome {
            Ok(session) => {
                self.connected.store(true, Ordering::Release);
                Ok(OpenSession {
                    session,
                    last_used: Instant::now(),
                })
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Failed to open session");
                Err(e)
            }
        }
    }
}
