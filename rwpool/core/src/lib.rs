//! rwpool Core - Read/Write Split Connection Pools
//!
//! Load-balancing connection pools for databases that expose separate
//! write-capable and read-only endpoints (for example MySQL Router on ports
//! 6446 and 6447). Two pools of lazy connections are kept, every statement
//! is classified as a read or a write, and it is dispatched to the worker
//! with the fewest outstanding statements in the matching pool.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |      Router      |  <-- classify, select, dispatch
//! +--------+---------+
//!          |
//!    +-----+------+
//!    |            |
//!    v            v
//! +-------+   +-------+
//! | write |   | read  |  <-- ConnectionPool (fixed size)
//! | pool  |   | pool  |
//! +---+---+   +---+---+
//!     |           |
//!     v           v
//!  ConnectionWorker x N   <-- job counter + LazyConnection
//!          |
//!          v
//!       Driver            <-- sqlx MySQL, or any other client
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use rwpool_core::{MySqlDriver, MySqlRouter, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig::new("10.0.0.5", "shop", "app", "secret");
//!     let router = MySqlRouter::new(config, MySqlDriver::new())?;
//!
//!     let users = router.query("SELECT id, name FROM users")?.await?;
//!     println!("{} users", users.rows.len());
//!
//!     let done = router.query("INSERT INTO audit (msg) VALUES ('hi')")?.await?;
//!     println!("inserted id {}", done.last_insert_id);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: Pool parameters, TOML/environment loading
//! - [`endpoint`]: Per-pool connection parameters and URI rendering
//! - [`driver`]: Database client abstraction
//! - [`connection`]: Lazily established, reused sessions
//! - [`worker`]: Outstanding-job accounting per connection
//! - [`pool`]: Fixed worker sets and least-loaded selection
//! - [`query`]: Read/write classification
//! - [`router`]: Pool ownership and dispatch
//! - [`metrics`]: Routing counters
//! - `mysql`: `sqlx` MySQL driver (feature `mysql`)

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod driver;
pub mod endpoint;
pub mod metrics;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod pool;
pub mod query;
pub mod router;
pub mod worker;

#[cfg(test)]
pub mod test_utils;

pub use config::{
    default_config_path, load_config, load_config_from_path, resolve_config, ConfigError,
    RouterConfig,
};
pub use connection::LazyConnection;
pub use driver::Driver;
pub use endpoint::Endpoint;
pub use metrics::{MetricsSnapshot, RouterMetrics};
pub use pool::ConnectionPool;
pub use query::QueryKind;
pub use router::{BestConnections, QueryBuilder, Router, RouterError};
pub use worker::{ConnectionWorker, JobGuard, QueryFuture};

#[cfg(feature = "mysql")]
pub use mysql::{MySqlDriver, MySqlResultSet, MySqlRouter};
