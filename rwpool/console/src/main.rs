//! rwpool Console - Run Statements Through the Read/Write Router
//!
//! Loads the pool configuration, builds a MySQL router and pushes each
//! statement through it. Reads go to the read-only endpoint, everything
//! else to the write endpoint. One JSON line is printed per statement.
//!
//! # Usage
//!
//! ```bash
//! # Statements from arguments
//! rwpool-console -e "SELECT NOW()" -e "UPDATE t SET x = 1"
//!
//! # One statement per line from stdin
//! cat statements.sql | rwpool-console --config /etc/rwpool/rwpool.toml
//!
//! # Password comes from the config file or RWPOOL_PASSWORD
//! RWPOOL_PASSWORD=secret rwpool-console --host 10.0.0.5 --database app --username app
//!
//! # Verbose logging
//! RUST_LOG=debug rwpool-console -e "SHOW TABLES"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rwpool_core::{
    default_config_path, resolve_config, MySqlDriver, MySqlResultSet, MySqlRouter, QueryKind,
    RouterConfig,
};
use serde::Serialize;
use sqlx::{Column, Row};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

/// rwpool Console - route SQL statements across write and read pools
#[derive(Parser, Debug)]
#[command(name = "rwpool-console")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "RWPOOL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database host (overrides config and environment)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Database name
    #[arg(long, value_name = "NAME")]
    database: Option<String>,

    /// Database user
    #[arg(long, value_name = "USER")]
    username: Option<String>,

    /// Statement to run; repeatable. Without any, statements are read from stdin
    #[arg(short = 'e', long = "execute", value_name = "SQL")]
    execute: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "RWPOOL_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    /// `--config`, or the default location when absent
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }
}

/// Apply `--host`, `--database` and `--username` on top of file and
/// environment values
fn apply_cli_overrides(config: &mut RouterConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(database) = &args.database {
        config.database.clone_from(database);
    }
    if let Some(username) = &args.username {
        config.username.clone_from(username);
    }
}

/// Resolve file, environment and CLI values (highest last), then validate
fn load_config(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Result<RouterConfig> {
    let path = args.config_path();
    let mut config =
        resolve_config(path.as_deref(), lookup).context("Failed to load configuration")?;

    apply_cli_overrides(&mut config, args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// One printed line per statement
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome {
    Ok {
        kind: QueryKind,
        rows: usize,
        rows_affected: u64,
        last_insert_id: u64,
        columns: Vec<String>,
    },
    Error {
        kind: QueryKind,
        message: String,
    },
}

impl Outcome {
    fn from_result(kind: QueryKind, result: &MySqlResultSet) -> Self {
        let columns = result
            .rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        Outcome::Ok {
            kind,
            rows: result.rows.len(),
            rows_affected: result.rows_affected,
            last_insert_id: result.last_insert_id,
            columns,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("rwpool_console={level},rwpool_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Run one statement and print its outcome; returns whether it succeeded
async fn run_statement<W>(router: &MySqlRouter, sql: &str, out: &mut W) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let kind = QueryKind::classify(sql);
    let pending = router.query(sql).context("Router refused statement")?;

    let (outcome, ok) = match pending.await {
        Ok(result) => (Outcome::from_result(kind, &result), true),
        Err(e) => {
            warn!(pool = %kind, error = %e, "Statement failed");
            (
                Outcome::Error {
                    kind,
                    message: e.to_string(),
                },
                false,
            )
        }
    };

    write_line(out, &outcome).await?;
    Ok(ok)
}

/// Write one JSON line and flush
async fn write_line<W, T>(out: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    out.write_all(&line).await.context("Failed to write stdout")?;
    out.flush().await.context("Failed to flush stdout")?;
    Ok(())
}

/// Run `-e` statements, or stdin lines when none were given
async fn run(router: &MySqlRouter, statements: &[String]) -> Result<usize> {
    let mut out = tokio::io::stdout();
    let mut failures = 0;

    if statements.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            if !run_statement(router, &line, &mut out).await? {
                failures += 1;
            }
        }
    } else {
        for sql in statements {
            if !run_statement(router, sql, &mut out).await? {
                failures += 1;
            }
        }
    }

    Ok(failures)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args, |key| std::env::var(key).ok())?;

    info!(
        write = %config.write_endpoint(),
        read = %config.read_endpoint(),
        "Routing statements"
    );

    let router = MySqlRouter::new(config, MySqlDriver::new()).context("Failed to build pools")?;
    let result = run(&router, &args.execute).await;

    router.disconnect_all().await;
    info!(metrics = ?router.metrics(), "Console finished");

    match result {
        Ok(0) => Ok(()),
        Ok(failures) => {
            error!(failures, "Some statements failed");
            anyhow::bail!("{failures} statement(s) failed")
        }
        Err(e) => {
            error!(error = %e, "Console stopped with error");
            Err(e)
        }
    }
}
