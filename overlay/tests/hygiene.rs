//! Hygiene: enforces coding standards at test time.
//!
//! Scans the overlay crate's production sources for patterns that either
//! crash the host page or silently swallow errors. Every pattern has a budget
//! of zero; the budget never grows.

use std::fs;
use std::path::{Path, PathBuf};

/// `(pattern, budget, why it is banned)`
const BUDGETS: &[(&str, usize, &str)] = &[
    (".unwrap()", 0, "panics on None/Err"),
    (".expect(", 0, "panics on None/Err"),
    ("panic!(", 0, "aborts the wasm instance"),
    ("unreachable!(", 0, "aborts the wasm instance"),
    ("todo!(", 0, "unfinished stub"),
    ("unimplemented!(", 0, "unfinished stub"),
    ("let _ =", 0, "discards a value without inspecting it"),
    (".ok()", 0, "discards the error"),
    ("#[allow(dead_code)]", 0, "hides unused code"),
];

/// Production `.rs` files under `overlay/src/`, excluding `*_test.rs`.
fn production_sources() -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    walk(Path::new("src"), &mut out);
    out
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            walk(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

fn hits(sources: &[(PathBuf, String)], pattern: &str) -> Vec<String> {
    sources
        .iter()
        .flat_map(|(path, content)| {
            content
                .lines()
                .enumerate()
                .filter(move |(_, line)| line.contains(pattern))
                .map(move |(n, line)| format!("  {}:{}: {}", path.display(), n + 1, line.trim()))
        })
        .collect()
}

#[test]
fn sources_are_found() {
    assert!(!production_sources().is_empty(), "no sources under src/");
}

#[test]
fn pattern_budgets_hold() {
    let sources = production_sources();
    let mut failures = Vec::new();
    for &(pattern, budget, reason) in BUDGETS {
        let found = hits(&sources, pattern);
        if found.len() > budget {
            failures.push(format!("{pattern} ({reason}): found {}, max {budget}\n{}", found.len(), found.join("\n")));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n\n"));
}
