use crate::results::ResultsDb;
use std::path::Path;
use tracing::{info, warn};

pub const MIN_COLS: u16 = 60;
pub const MIN_ROWS: u16 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// What the environment looks like right now. Gathered by the caller so the
/// checks themselves stay free of terminal calls.
#[derive(Debug, Clone)]
pub struct CheckInputs<'a> {
    pub stdin_is_tty: bool,
    pub terminal_size: Option<(u16, u16)>,
    pub results_db: &'a Path,
    pub base_url: &'a str,
}

pub fn run_checks(inputs: &CheckInputs) -> Vec<CheckResult> {
    let results = vec![
        check_tty(inputs.stdin_is_tty),
        check_terminal_size(inputs.terminal_size),
        check_results_store(inputs.results_db),
        check_base_url(inputs.base_url),
    ];

    for r in &results {
        if r.passed {
            info!(check = r.name, "pre-check passed");
        } else {
            warn!(check = r.name, detail = %r.detail, "pre-check failed");
        }
    }

    results
}

pub fn all_passed(results: &[CheckResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.passed)
}

fn check_tty(is_tty: bool) -> CheckResult {
    if is_tty {
        CheckResult::pass("terminal", "interactive input available")
    } else {
        CheckResult::fail("terminal", "stdin must be a tty")
    }
}

fn check_terminal_size(size: Option<(u16, u16)>) -> CheckResult {
    match size {
        Some((cols, rows)) if cols >= MIN_COLS && rows >= MIN_ROWS => {
            CheckResult::pass("screen size", format!("{cols}x{rows}"))
        }
        Some((cols, rows)) => CheckResult::fail(
            "screen size",
            format!("{cols}x{rows}, need at least {MIN_COLS}x{MIN_ROWS}"),
        ),
        None => CheckResult::fail("screen size", "terminal size unknown"),
    }
}

fn check_results_store(path: &Path) -> CheckResult {
    match ResultsDb::open(path) {
        Ok(_) => CheckResult::pass("results store", path.display().to_string()),
        Err(err) => CheckResult::fail("results store", err.to_string()),
    }
}

fn check_base_url(url: &str) -> CheckResult {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => {
            CheckResult::pass("puzzle service", url.to_string())
        }
        _ => CheckResult::fail("puzzle service", format!("not an http(s) url: {url:?}")),
    }
}
