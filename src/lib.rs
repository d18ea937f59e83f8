//! A debugging ledger for traced WebAssembly allocators.
//!
//! A guest module installs [`TracingAllocator`] as its global allocator, and
//! every `alloc`, `alloc_zeroed`, `dealloc` and `realloc` is reported to a set
//! of hooks as `(size, align, address)`. On the other side of those hooks a
//! [`Tracker`] keeps:
//!
//! - a [`LiveLedger`] of what is allocated right now, and who allocated it;
//! - an [`InvalidFreeLog`] of every free that didn't match a live
//!   allocation (double frees, frees of garbage).
//!
//! Either can be turned into a ranked, grouped [`Table`] on demand, by default
//! counting records per call site.
//!
//! ```
//! use alloc_ledger::Tracker;
//!
//! let tracker = Tracker::with_provider(|| "main".to_owned());
//! tracker.on_alloc(16, 8, 0x100);
//! tracker.on_alloc(32, 8, 0x200);
//! tracker.on_dealloc(16, 8, 0x100);
//! tracker.on_dealloc(16, 8, 0x100);
//!
//! assert_eq!(tracker.live_count(), 1);
//! assert_eq!(tracker.invalid_frees().len(), 1);
//!
//! let report = tracker.dump_invalid_frees(None);
//! assert_eq!(report.get("main"), Some(1));
//! println!("{report}");
//! ```
//!
//! [`TracingAllocator`]: alloc::tracing::TracingAllocator
//! [`LiveLedger`]: ledger::LiveLedger
//! [`InvalidFreeLog`]: ledger::InvalidFreeLog

pub mod alloc;
pub mod config;
pub mod externc;
pub mod ledger;
pub mod provenance;
pub mod report;
pub mod serialize;
pub mod tracker;
mod util;

pub use alloc::meta::{AllocRecord, Allocation, InvalidFree};
pub use config::{ProvenanceMode, TrackerConfig};
pub use provenance::ProvenanceProvider;
pub use report::{ReportConfig, ReportOverride, Table};
pub use tracker::Tracker;
