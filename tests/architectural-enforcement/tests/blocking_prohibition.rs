//! Integration Test: Blocking Call Prohibition
//!
//! **Policy**: Router, pool and connection code runs on the tokio runtime and
//! MUST NOT block it.
//! **Required**: `tokio::time::sleep`, `tokio::fs`, `tokio::net`, `tokio::io`
//! (including `tokio::io::stdout()` for output) inside async code.

use std::path::Path;

use architectural_enforcement::{scan_directory, workspace_root, Violation};

fn report(violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\nBlocking calls found in production code:\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\nFORBIDDEN:");
    eprintln!("  - std::thread::sleep (anywhere outside tests)");
    eprintln!("  - std::fs::*, std::net::* inside async fn");
    eprintln!("  - std::io::stdin() / stdout(), print!/println! inside async fn");
    eprintln!("\nACCEPTABLE:");
    eprintln!("  - Config loading in non-async functions");
    eprintln!("  - Test code and mock drivers");

    panic!("\nFound {} blocking call(s). Fix these before merging!", violations.len());
}

#[test]
fn test_no_blocking_calls_in_core() {
    let dir = workspace_root().join("rwpool/core/src");
    assert!(dir.exists(), "core sources not found at {}", dir.display());

    report(&scan_directory(&dir));
}

#[test]
fn test_no_blocking_calls_in_console() {
    let dir = workspace_root().join("rwpool/console/src");
    assert!(dir.exists(), "console sources not found at {}", dir.display());

    report(&scan_directory(&dir));
}

#[test]
fn test_missing_directory_is_clean() {
    assert!(scan_directory(Path::new("does/not/exist")).is_empty());
}
