//! Database Endpoints
//!
//! Connection parameters for one side of the read/write split. The router
//! builds one endpoint for the write port and one for the read port; every
//! worker of a pool connects to the same endpoint.

use std::fmt;
use std::time::Duration;

/// Connection parameters for a single database endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Database (schema) name
    pub database: String,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Upper bound for establishing a session
    pub connect_timeout: Duration,
    /// Sessions unused for this long are closed and re-opened on next use
    pub idle_timeout: Duration,
}

impl Endpoint {
    /// Render the connection URI
    ///
    /// Shape: `username:password@host:port/database?idle=<secs>&timeout=<secs>`
    /// with the password URL-encoded.
    #[must_use]
    pub fn uri(&self) -> String {
        self.render(&urlencoding::encode(&self.password))
    }

    /// Render the connection URI with the password masked, for logs
    #[must_use]
    pub fn redacted_uri(&self) -> String {
        self.render("***")
    }

    fn render(&self, password: &str) -> String {
        format!(
            "{}:{}@{}:{}/{}?idle={}&timeout={}",
            self.username,
            password,
            self.host,
            self.port,
            self.database,
            self.idle_timeout.as_secs(),
            self.connect_timeout.as_secs()
        )
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_uri())
    }
}
