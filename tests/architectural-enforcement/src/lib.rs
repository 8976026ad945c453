//! Architectural Enforcement Integration Tests
//!
//! Source scanners backing the integration tests in `tests/`:
//! - No thread sleeps in production code
//! - No blocking file, network or terminal I/O inside `async fn`,
//!   including `print!`/`println!`
//!
//! Statements are routed from async tasks on a shared runtime, so a single
//! blocking call stalls every pool worker scheduled on that thread.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden call found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the call
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Rule that matched
    pub rule: &'static str,
    /// Offending source line, trimmed
    pub source: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.rule,
            self.source
        )
    }
}

/// Workspace root, resolved from this crate's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Scan every `.rs` file under `dir`
///
/// Mock modules (`test_utils.rs`) are skipped. A missing directory yields
/// no violations.
pub fn scan_directory(dir: &Path) -> Vec<Violation> {
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) == Some("test_utils.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(path) {
            violations.extend(scan_source(path, &content));
        }
    }

    violations
}

/// Scan one file's contents
///
/// Everything from the first `#[cfg(test)]` onwards is treated as test code.
pub fn scan_source(path: &Path, content: &str) -> Vec<Violation> {
    let lines: Vec<&str> = content.lines().collect();
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }

        let code = line.split("//").next().unwrap_or(line);
        let mut push = |rule: &'static str| {
            violations.push(Violation {
                path: path.to_path_buf(),
                line: idx + 1,
                rule,
                source: trimmed.to_string(),
            });
        };

        if code.contains("thread::sleep") {
            push("Thread sleep");
        }

        if !is_in_async_function(&lines, idx) {
            continue;
        }

        if code.contains("std::fs::") {
            push("Blocking file I/O in async");
        }
        if code.contains("std::net::") {
            push("Blocking network I/O in async");
        }
        if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
            push("Blocking stdin/stdout in async");
        }
        if code.contains("println!(") || code.contains("print!(") {
            push("Blocking stdout print in async");
        }
    }

    violations
}

/// Whether the nearest enclosing `fn` above `current_idx` is async
fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for line in lines[..=current_idx].iter().rev() {
        let line = line.trim();
        if line.starts_with("//") {
            continue;
        }
        if line.contains("fn ") && (line.starts_with("fn ") || line.contains(" fn ")) {
            return line.contains("async fn ");
        }
        if line.starts_with("mod ") || line.starts_with("impl ") {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<Violation> {
        scan_source(Path::new("sample.rs"), src)
    }

    #[test]
    fn test_sleep_is_flagged_anywhere() {
        let found = scan("fn wait() {\n    std::thread::sleep(d);\n}\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].rule, "Thread sleep");
    }

    #[test]
    fn test_blocking_fs_only_flagged_in_async() {
        let sync_fn = "fn load() {\n    let s = std::fs::read_to_string(p);\n}\n";
        assert!(scan(sync_fn).is_empty());

        let async_fn = "async fn load() {\n    let s = std::fs::read_to_string(p);\n}\n";
        assert_eq!(scan(async_fn)[0].rule, "Blocking file I/O in async");
    }

    #[test]
    fn test_async_method_in_impl() {
        let src = "impl Conn {\n    pub async fn open(&self) {\n        std::net::TcpStream::connect(a);\n    }\n}\n";
        assert_eq!(scan(src).len(), 1);
    }

    #[test]
    fn test_test_module_is_skipped() {
        let src = "fn ok() {}\n\n#[cfg(test)]\nmod tests {\n    async fn t() { std::thread::sleep(d); }\n}\n";
        assert!(scan(src).is_empty());
    }

    #[test]
    fn test_comments_are_ignored() {
        let src = "async fn f() {\n    // std::thread::sleep would block here\n    g().await; // not std::fs::read\n}\n";
        assert!(scan(src).is_empty());
    }

    #[test]
    fn test_print_macros_flagged_in_async() {
        let async_fn = "async fn emit() {\n    println!(\"{}\", line);\n}\n";
        let found = scan(async_fn);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "Blocking stdout print in async");

        let sync_fn = "fn emit() {\n    println!(\"{}\", line);\n}\n";
        assert!(scan(sync_fn).is_empty());
    }

    #[test]
    fn test_violation_display() {
        let found = scan("async fn f() {\n    std::io::stdin();\n}\n");
        assert_eq!(
            found[0].to_string(),
            "sample.rs:2 - Blocking stdin/stdout in async: std::io::stdin();"
        );
    }
}
