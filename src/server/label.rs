//! Best-effort debug label for data directory names.
//!
//! Rust's test harness names each test thread after the test path, so the
//! current thread name identifies the running test. Off the test harness we
//! fall back to the caller's source location.

use std::panic::Location;

use crate::constants::MAX_LABEL_LEN;

/// Thread names that never identify a test
const GENERIC_THREAD_NAMES: &[&str] = &["main", "tokio-runtime-worker"];

/// Label for a data directory created on behalf of `caller`. Always ends in `_`.
pub(crate) fn test_label(caller: &Location<'_>) -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) if !GENERIC_THREAD_NAMES.contains(&name) => {
            format!("{}_", sanitize(name))
        }
        _ => fallback_label(caller),
    }
}

pub(crate) fn fallback_label(caller: &Location<'_>) -> String {
    let file = std::path::Path::new(caller.file())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| caller.file().to_string());
    format!(
        "TestNameNotFound_{}_",
        sanitize(&format!("{}_{}", file, caller.line()))
    )
}

/// Keeps `[A-Za-z0-9_-]`, maps everything else to `_`, and truncates from the
/// front so the most specific path segment survives.
pub(crate) fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let skip = cleaned.len().saturating_sub(MAX_LABEL_LEN);
    cleaned[skip..].to_string()
}
