//! Tracker configuration.
//!
//! Read from the environment by [`TrackerConfig::from_env()`]:
//! - `ALLOC_LEDGER_STACKS`: `backtrace` (default, also `full`/`on`/`1`) to
//!   capture a provenance string per event, or `off` (`none`/`disabled`/`0`)
//!   to skip capture entirely. Capture is by far the most expensive part of a
//!   hook, so turning it off is the first thing to try when tracing is too
//!   slow.
//! - `ALLOC_LEDGER_FRAME_FILTERS`: comma-separated extra patterns; frames
//!   whose symbol contains one of them are cut from provenance strings (handy
//!   for your own allocator wrappers).

use crate::provenance::{BacktraceProvider, NoProvenance, ProvenanceProvider};

pub const STACKS_VAR: &str = "ALLOC_LEDGER_STACKS";
pub const FRAME_FILTERS_VAR: &str = "ALLOC_LEDGER_FRAME_FILTERS";

/// How provenance is captured for each event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvenanceMode {
    /// `std::backtrace`, filtered.
    #[default]
    Backtrace,
    /// Every record gets an empty provenance string.
    Off,
}

impl ProvenanceMode {
    /// Parse from string (case-insensitive). Anything unrecognised is the
    /// default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "backtrace" | "full" | "on" | "1" => Self::Backtrace,
            "off" | "none" | "disabled" | "0" => Self::Off,
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerConfig {
    pub provenance: ProvenanceMode,
    /// Patterns added on top of [`default_frame_filters()`].
    ///
    /// [`default_frame_filters()`]: crate::provenance::default_frame_filters
    pub frame_filters: Vec<String>,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env()`](Self::from_env), with the environment supplied by
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provenance = lookup(STACKS_VAR)
            .map(|v| ProvenanceMode::from_str_loose(&v))
            .unwrap_or_default();
        let frame_filters = lookup(FRAME_FILTERS_VAR)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            provenance,
            frame_filters,
        }
    }

    /// Build the provider this configuration describes.
    pub fn provider(&self) -> Box<dyn ProvenanceProvider> {
        match self.provenance {
            ProvenanceMode::Backtrace => Box::new(BacktraceProvider::with_extra_filters(
                self.frame_filters.iter().cloned(),
            )),
            ProvenanceMode::Off => Box::new(NoProvenance),
        }
    }
}
