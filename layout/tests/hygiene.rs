//! Hygiene: source-level standards for the layout crate, checked at test time.
//!
//! Production files under `layout/src/` are scanned for patterns that crash
//! the process, drop errors, or bypass structured logging. Each pattern has a
//! budget. Budgets only go down.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::{Path, PathBuf};

// Panics.
const MAX_UNWRAP: usize = 0;
const MAX_EXPECT: usize = 0;
const MAX_PANIC: usize = 0;
const MAX_UNREACHABLE: usize = 0;
const MAX_TODO: usize = 0;
const MAX_UNIMPLEMENTED: usize = 0;

// Silent loss.
const MAX_SILENT_DISCARD: usize = 0;
const MAX_DOT_OK: usize = 0;

// Output goes through `tracing`.
const MAX_PRINTLN: usize = 0;
const MAX_EPRINTLN: usize = 0;

// Structure.
const MAX_ALLOW_DEAD_CODE: usize = 0;

struct SourceFile {
    path: PathBuf,
    content: String,
}

impl SourceFile {
    fn hits(&self, pattern: &str) -> usize {
        self.content.lines().filter(|line| line.contains(pattern)).count()
    }
}

fn collect(dir: &Path, out: &mut Vec<SourceFile>, include_tests: bool) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out, include_tests);
            continue;
        }
        if !path.extension().is_some_and(|e| e == "rs") {
            continue;
        }
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_test && !include_tests {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path, content });
        }
    }
}

/// Production `.rs` files in `src/`; `*_test.rs` siblings are skipped.
fn production_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect(Path::new("src"), &mut files, false);
    files
}

fn check_budget(pattern: &str, max: usize) {
    let files = production_files();
    assert!(!files.is_empty(), "no source files found; run from the crate root");
    let hits: Vec<(String, usize)> = files
        .iter()
        .map(|f| (f.path.display().to_string(), f.hits(pattern)))
        .filter(|(_, n)| *n > 0)
        .collect();
    let count: usize = hits.iter().map(|(_, n)| n).sum();
    let listing = hits.iter().map(|(p, n)| format!("  {p}: {n}")).collect::<Vec<_>>().join("\n");
    assert!(count <= max, "`{pattern}` budget exceeded: found {count}, max {max}.\n{listing}");
}

#[test]
fn unwrap_budget() {
    check_budget(".unwrap()", MAX_UNWRAP);
}

#[test]
fn expect_budget() {
    check_budget(".expect(", MAX_EXPECT);
}

#[test]
fn panic_budget() {
    check_budget("panic!(", MAX_PANIC);
}

#[test]
fn unreachable_budget() {
    check_budget("unreachable!(", MAX_UNREACHABLE);
}

#[test]
fn todo_budget() {
    check_budget("todo!(", MAX_TODO);
}

#[test]
fn unimplemented_budget() {
    check_budget("unimplemented!(", MAX_UNIMPLEMENTED);
}

#[test]
fn silent_discard_budget() {
    check_budget("let _ =", MAX_SILENT_DISCARD);
}

#[test]
fn dot_ok_budget() {
    check_budget(".ok()", MAX_DOT_OK);
}

#[test]
fn println_budget() {
    check_budget("println!(", MAX_PRINTLN);
}

#[test]
fn eprintln_budget() {
    check_budget("eprintln!(", MAX_EPRINTLN);
}

#[test]
fn allow_dead_code_budget() {
    check_budget("#[allow(dead_code)]", MAX_ALLOW_DEAD_CODE);
}

/// Every `#[path = "x_test.rs"]` attribute points at a file that exists.
#[test]
fn test_siblings_exist() {
    let mut files = Vec::new();
    collect(Path::new("src"), &mut files, true);
    let mut missing = Vec::new();
    for file in &files {
        let dir = file.path.parent().unwrap_or(Path::new("src"));
        for line in file.content.lines() {
            let Some(rest) = line.trim().strip_prefix("#[path = \"") else {
                continue;
            };
            let Some(name) = rest.split('"').next() else {
                continue;
            };
            if !dir.join(name).exists() {
                missing.push(format!("  {}: {name}", file.path.display()));
            }
        }
    }
    assert!(missing.is_empty(), "missing test siblings:\n{}", missing.join("\n"));
}
