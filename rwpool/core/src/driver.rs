//! Driver Abstraction
//!
//! The seam between the pool/router and the database client library. A
//! driver knows how to open a session against an [`Endpoint`], run one
//! statement on it and close it again. Everything above this trait
//! (laziness, load tracking, routing) is driver-agnostic.

use async_trait::async_trait;

use crate::endpoint::Endpoint;

/// A database client usable by connection workers
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// An open session (one network connection)
    type Session: Send + 'static;

    /// Result of a single statement
    type ResultSet: Send + 'static;

    /// Error type of the client library, passed to callers untouched
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new session
    ///
    /// The caller bounds this with the endpoint's connect timeout.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Session, Self::Error>;

    /// Run one statement on an open session
    async fn execute(
        &self,
        session: &mut Self::Session,
        sql: &str,
    ) -> Result<Self::ResultSet, Self::Error>;

    /// Close a session gracefully
    async fn close(&self, session: Self::Session) {
        drop(session);
    }

    /// Error to report when opening a session exceeds the connect timeout
    fn connect_timeout_error(&self, endpoint: &Endpoint) -> Self::Error;

    /// Whether an error means the session is gone and must be re-opened
    fn is_disconnect(&self, _error: &Self::Error) -> bool {
        false
    }
}
