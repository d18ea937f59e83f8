//! C ABI for hosts that link this crate natively (a Wasmtime or Wasmer
//! embedder, say) and want to bind a guest's `WasmTracingAllocator` imports
//! straight to a tracker.
//!
//! These all go to one process-wide [`Tracker`], configured from the
//! environment the first time any of them is called. Hosts that want more
//! than one ledger should own their [`Tracker`]s and skip this module.

use std::ffi::{c_char, CStr};

use libc::{c_void, size_t};
use once_cell::sync::Lazy;

use crate::{
    config::TrackerConfig,
    report::{ReportOverride, Table},
    tracker::Tracker,
};

static TRACKER: Lazy<Tracker> = Lazy::new(|| Tracker::with_config(&TrackerConfig::from_env()));

/// The tracker behind the C entry points.
pub fn global_tracker() -> &'static Tracker {
    &TRACKER
}

#[no_mangle]
pub extern "C" fn alloc_ledger_on_alloc(size: size_t, align: size_t, pointer: *mut c_void) {
    TRACKER.on_alloc(size, align, pointer as usize)
}

#[no_mangle]
pub extern "C" fn alloc_ledger_on_dealloc(size: size_t, align: size_t, pointer: *mut c_void) {
    TRACKER.on_dealloc(size, align, pointer as usize)
}

#[no_mangle]
pub extern "C" fn alloc_ledger_on_alloc_zeroed(
    size: size_t,
    align: size_t,
    pointer: *mut c_void,
) {
    TRACKER.on_alloc_zeroed(size, align, pointer as usize)
}

#[no_mangle]
pub extern "C" fn alloc_ledger_on_realloc(
    old_pointer: *mut c_void,
    new_pointer: *mut c_void,
    old_size: size_t,
    new_size: size_t,
    align: size_t,
) {
    TRACKER.on_realloc(
        old_pointer as usize,
        new_pointer as usize,
        old_size,
        new_size,
        align,
    )
}

/// Read an optional JSON override. Null, non-UTF-8 and malformed input all
/// mean "use the defaults".
///
/// # Safety
///
/// `opts` must be null or point to a NUL-terminated string.
unsafe fn read_override(opts: *const c_char) -> Option<ReportOverride> {
    if opts.is_null() {
        return None;
    }
    // SAFETY: requirement passed to caller
    let json = unsafe { CStr::from_ptr(opts) }.to_str().ok()?;
    match ReportOverride::from_json(json) {
        Ok(over) => Some(over),
        Err(e) => {
            log::warn!("ignoring report override: {e}");
            None
        }
    }
}

fn print_table(table: &Table) {
    eprintln!("{table}");
}

/// Print the live-allocation report to stderr.
///
/// # Safety
///
/// `opts` must be null or point to a NUL-terminated JSON string (see
/// [`ReportOverride::from_json()`]).
#[no_mangle]
pub unsafe extern "C" fn alloc_ledger_dump_live_allocations(opts: *const c_char) {
    // SAFETY: requirement passed to caller
    let over = unsafe { read_override(opts) };
    print_table(&TRACKER.dump_live_allocations(over));
}

/// Print the invalid-free report to stderr.
///
/// # Safety
///
/// Same as [`alloc_ledger_dump_live_allocations()`].
#[no_mangle]
pub unsafe extern "C" fn alloc_ledger_dump_invalid_frees(opts: *const c_char) {
    // SAFETY: requirement passed to caller
    let over = unsafe { read_override(opts) };
    print_table(&TRACKER.dump_invalid_frees(over));
}
