//! The guest side: a [`GlobalAlloc`] wrapper that reports every allocator
//! event to a set of hooks *after* the wrapped allocator has done the real
//! work.
//!
//! In a Wasm module the hooks are [`ImportedHooks`], which call out to the
//! host through the `WasmTracingAllocator` import module. The bookkeeping
//! then happens outside linear memory, so the tracing can't perturb the heap
//! it is observing. Natively you can hand the wrapper any [`AllocHooks`],
//! including a [`Tracker`](crate::tracker::Tracker) directly, even when that
//! wrapper is the global allocator the tracker itself runs on: the tracker
//! keeps its own blocks out of the ledger (see
//! [the tracker docs](crate::tracker#reentrancy)).
//!
//! ```no_run
//! use std::alloc::System;
//! use alloc_ledger::alloc::tracing::{ImportedHooks, TracingAllocator};
//!
//! #[global_allocator]
//! static GLOBAL: TracingAllocator<System, ImportedHooks> =
//!     TracingAllocator::new(System, ImportedHooks);
//! # fn main() {}
//! ```

use std::alloc::{GlobalAlloc, Layout};

/// The four allocator lifecycle callbacks. These match the host import
/// signatures one-for-one.
pub trait AllocHooks {
    /// Invoked after each `GlobalAlloc::alloc`.
    fn on_alloc(&self, size: usize, align: usize, pointer: *mut u8);

    /// Invoked after each `GlobalAlloc::dealloc`.
    fn on_dealloc(&self, size: usize, align: usize, pointer: *mut u8);

    /// Invoked after each `GlobalAlloc::alloc_zeroed`.
    fn on_alloc_zeroed(&self, size: usize, align: usize, pointer: *mut u8);

    /// Invoked after each `GlobalAlloc::realloc`.
    fn on_realloc(
        &self,
        old_pointer: *mut u8,
        new_pointer: *mut u8,
        old_size: usize,
        new_size: usize,
        align: usize,
    );
}

impl<H> AllocHooks for &H
where
    H: AllocHooks + ?Sized,
{
    fn on_alloc(&self, size: usize, align: usize, pointer: *mut u8) {
        (**self).on_alloc(size, align, pointer)
    }

    fn on_dealloc(&self, size: usize, align: usize, pointer: *mut u8) {
        (**self).on_dealloc(size, align, pointer)
    }

    fn on_alloc_zeroed(&self, size: usize, align: usize, pointer: *mut u8) {
        (**self).on_alloc_zeroed(size, align, pointer)
    }

    fn on_realloc(
        &self,
        old_pointer: *mut u8,
        new_pointer: *mut u8,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) {
        (**self).on_realloc(old_pointer, new_pointer, old_size, new_size, align)
    }
}

#[cfg(target_arch = "wasm32")]
mod imports {
    #[link(wasm_import_module = "WasmTracingAllocator")]
    extern "C" {
        pub fn on_alloc(size: usize, align: usize, pointer: *mut u8);
        pub fn on_dealloc(size: usize, align: usize, pointer: *mut u8);
        pub fn on_alloc_zeroed(size: usize, align: usize, pointer: *mut u8);
        pub fn on_realloc(
            old_pointer: *mut u8,
            new_pointer: *mut u8,
            old_size: usize,
            new_size: usize,
            align: usize,
        );
    }
}

/// Hooks implemented by the host, imported from the `WasmTracingAllocator`
/// module. Off `wasm32` there is no host to call, so these do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImportedHooks;

#[cfg(target_arch = "wasm32")]
impl AllocHooks for ImportedHooks {
    // SAFETY (all four): the host provides these imports and they only ever
    // receive integers, nothing is dereferenced on our side.

    fn on_alloc(&self, size: usize, align: usize, pointer: *mut u8) {
        unsafe { imports::on_alloc(size, align, pointer) }
    }

    fn on_dealloc(&self, size: usize, align: usize, pointer: *mut u8) {
        unsafe { imports::on_dealloc(size, align, pointer) }
    }

    fn on_alloc_zeroed(&self, size: usize, align: usize, pointer: *mut u8) {
        unsafe { imports::on_alloc_zeroed(size, align, pointer) }
    }

    fn on_realloc(
        &self,
        old_pointer: *mut u8,
        new_pointer: *mut u8,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) {
        unsafe { imports::on_realloc(old_pointer, new_pointer, old_size, new_size, align) }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AllocHooks for ImportedHooks {
    fn on_alloc(&self, _: usize, _: usize, _: *mut u8) {}

    fn on_dealloc(&self, _: usize, _: usize, _: *mut u8) {}

    fn on_alloc_zeroed(&self, _: usize, _: usize, _: *mut u8) {}

    fn on_realloc(&self, _: *mut u8, _: *mut u8, _: usize, _: usize, _: usize) {}
}

/// A global allocator that traces the module's allocations and
/// deallocations. The allocator `A` does the actual work; `H` hears about it
/// afterwards.
#[derive(Debug)]
pub struct TracingAllocator<A, H = ImportedHooks>
where
    A: GlobalAlloc,
    H: AllocHooks,
{
    allocator: A,
    hooks: H,
}

impl<A, H> TracingAllocator<A, H>
where
    A: GlobalAlloc,
    H: AllocHooks,
{
    pub const fn new(allocator: A, hooks: H) -> Self {
        Self { allocator, hooks }
    }

    /// Return the underlying allocator
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }

    pub const fn hooks(&self) -> &H {
        &self.hooks
    }
}

unsafe impl<A, H> GlobalAlloc for TracingAllocator<A, H>
where
    A: GlobalAlloc,
    H: AllocHooks,
{
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds the `GlobalAlloc` contract for `layout`
        let pointer = unsafe { self.allocator.alloc(layout) };
        self.hooks.on_alloc(layout.size(), layout.align(), pointer);
        pointer
    }

    unsafe fn dealloc(&self, pointer: *mut u8, layout: Layout) {
        // SAFETY: caller guarantees `pointer` came from this allocator with
        //         this `layout`
        unsafe { self.allocator.dealloc(pointer, layout) };
        self.hooks.on_dealloc(layout.size(), layout.align(), pointer);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: as for `alloc()`
        let pointer = unsafe { self.allocator.alloc_zeroed(layout) };
        self.hooks
            .on_alloc_zeroed(layout.size(), layout.align(), pointer);
        pointer
    }

    unsafe fn realloc(&self, old_pointer: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller upholds the `GlobalAlloc::realloc` contract
        let new_pointer = unsafe { self.allocator.realloc(old_pointer, layout, new_size) };
        self.hooks.on_realloc(
            old_pointer,
            new_pointer,
            layout.size(),
            new_size,
            layout.align(),
        );
        new_pointer
    }
}
