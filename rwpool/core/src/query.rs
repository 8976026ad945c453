//! Query Classification
//!
//! Statements are split into reads and writes by a purely lexical prefix
//! test: text starting with `select` or `show` (any case) is a read,
//! everything else is a write. There is no trimming and no SQL parsing, so
//! a leading comment, whitespace or a `WITH` clause makes a statement a
//! write.

use std::fmt;

use serde::{Deserialize, Serialize};

const READ_PREFIXES: [&str; 2] = ["select", "show"];

/// Which pool a statement belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Served by the read-only pool
    Read,
    /// Served by the write-capable pool
    Write,
}

impl QueryKind {
    /// Classify a statement by its leading keyword
    #[must_use]
    pub fn classify(sql: &str) -> Self {
        let head = sql.as_bytes();
        let is_read = READ_PREFIXES.iter().any(|prefix| {
            head.get(..prefix.len())
                .is_some_and(|p| p.eq_ignore_ascii_case(prefix.as_bytes()))
        });

        if is_read {
            Self::Read
        } else {
            Self::Write
        }
    }

    /// Lowercase label used in logs and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
