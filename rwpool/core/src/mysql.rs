//! MySQL Driver
//!
//! [`Driver`] implementation on top of `sqlx`. Each session is one
//! `MySqlConnection`; statements run through the text protocol so any SQL
//! the server accepts (including `SHOW`, DDL and multi-statement strings)
//! can be routed.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Either, Executor};

use crate::driver::Driver;
use crate::endpoint::Endpoint;
use crate::router::Router;

/// Router over MySQL endpoints
pub type MySqlRouter = Router<MySqlDriver>;

/// Rows and counters produced by one statement
#[derive(Default)]
pub struct MySqlResultSet {
    /// Rows returned, in server order
    pub rows: Vec<MySqlRow>,
    /// Rows changed by the statement(s)
    pub rows_affected: u64,
    /// Last `AUTO_INCREMENT` value generated, 0 if none
    pub last_insert_id: u64,
}

/// `sqlx`-backed MySQL driver
#[derive(Clone, Copy, Debug, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create the driver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Connect options parsed from the endpoint's rendered URI
    ///
    /// The `idle` and `timeout` query keys are not sqlx options and are
    /// ignored by its parser; the connection layer enforces both.
    ///
    /// # Errors
    ///
    /// Returns [`sqlx::Error::Configuration`] if the URI does not parse.
    pub fn options(endpoint: &Endpoint) -> Result<MySqlConnectOptions, sqlx::Error> {
        format!("mysql://{}", endpoint.uri()).parse()
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    type Session = MySqlConnection;
    type ResultSet = MySqlResultSet;
    type Error = sqlx::Error;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MySqlConnection, sqlx::Error> {
        MySqlConnection::connect_with(&Self::options(endpoint)?).await
    }

    async fn execute(
        &self,
        session: &mut MySqlConnection,
        sql: &str,
    ) -> Result<MySqlResultSet, sqlx::Error> {
        let mut result = MySqlResultSet::default();
        let mut stream = session.fetch_many(sqlx::raw_sql(sql));

        while let Some(step) = stream.try_next().await? {
            match step {
                Either::Left(done) => {
                    result.rows_affected += done.rows_affected();
                    if done.last_insert_id() != 0 {
                        result.last_insert_id = done.last_insert_id();
                    }
                }
                Either::Right(row) => result.rows.push(row),
            }
        }

        Ok(result)
    }

    async fn close(&self, session: MySqlConnection) {
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "Session did not close cleanly");
        }
    }

    fn connect_timeout_error(&self, endpoint: &Endpoint) -> sqlx::Error {
        sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!(
                "connecting to {}:{} timed out after {:?}",
                endpoint.host, endpoint.port, endpoint.connect_timeout
            ),
        ))
    }

    fn is_disconnect(&self, error: &sqlx::Error) -> bool {
        matches!(
            error,
            sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed
        )
    }
}
