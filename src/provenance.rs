//! Call-site provenance for ledger records.
//!
//! A provenance string is the caller's view of the stack at the moment a hook
//! fired: every frame that belongs to the instrumentation itself is cut out,
//! the rest is joined in order. Two events with textually identical strings
//! are "the same call site" as far as reports are concerned, whatever their
//! sizes or addresses.
//!
//! Capture is a capability ([`ProvenanceProvider`]) rather than a hard-wired
//! backtrace, so tests (and hosts that know better, e.g. a Wasm host that can
//! walk guest frames) can plug in their own.

use std::backtrace::{Backtrace, BacktraceStatus};

/// Something that can say where we are right now.
///
/// Implementations must not panic, and should return an empty string rather
/// than fail: a hook is not allowed to abort the allocation it observes.
pub trait ProvenanceProvider: Send + Sync {
    fn capture(&self) -> String;
}

impl<F> ProvenanceProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn capture(&self) -> String {
        self()
    }
}

/// Provenance switched off. Every event gets the empty string, so reports
/// collapse to a single group.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProvenance;

impl ProvenanceProvider for NoProvenance {
    fn capture(&self) -> String {
        String::new()
    }
}

/// Frame patterns that identify the instrumentation layer (and the backtrace
/// machinery underneath it).
pub fn default_frame_filters() -> Vec<String> {
    let krate = env!("CARGO_CRATE_NAME");
    let mut filters: Vec<String> = [
        "tracker",
        "provenance",
        "externc",
        "alloc::tracing",
        "util",
    ]
    .iter()
    .map(|module| format!("{krate}::{module}"))
    .collect();
    filters.extend(
        ["std::backtrace", "std::backtrace_rs", "backtrace::"]
            .iter()
            .map(|s| s.to_string()),
    );
    filters
}

/// Provenance from `std::backtrace`, with instrumentation frames removed.
#[derive(Clone, Debug)]
pub struct BacktraceProvider {
    filters: Vec<String>,
}

impl BacktraceProvider {
    pub fn new() -> Self {
        Self {
            filters: default_frame_filters(),
        }
    }

    /// Also drop frames whose symbol line contains any of `extra`.
    pub fn with_extra_filters<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut provider = Self::new();
        provider.filters.extend(extra.into_iter().map(Into::into));
        provider
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }
}

impl Default for BacktraceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceProvider for BacktraceProvider {
    fn capture(&self) -> String {
        let backtrace = Backtrace::force_capture();
        if backtrace.status() != BacktraceStatus::Captured {
            return String::new();
        }
        filter_frames(&backtrace.to_string(), &self.filters)
    }
}

/// Is this line the start of a frame (`  12: some::symbol`)?
fn frame_header(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let (index, rest) = trimmed.split_once(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}

/// Take a rendered backtrace, drop every frame whose symbol matches one of
/// `filters`, and join what is left into one provenance string.
///
/// A frame is its symbol line plus any `at file:line` lines after it. Frame
/// indices are stripped, since they depend on how deep in the
/// instrumentation we were when capturing, which would otherwise make the
/// same call site look different depending on which hook it came through.
pub fn filter_frames(rendered: &str, filters: &[String]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut keeping = false;

    for line in rendered.lines() {
        if let Some(symbol) = frame_header(line) {
            keeping = !filters.iter().any(|f| symbol.contains(f.as_str()));
            if keeping {
                kept.push(symbol);
            }
        } else if keeping {
            let line = line.trim();
            if !line.is_empty() {
                kept.push(line);
            }
        }
    }

    kept.join("\n")
}
