//! The two pieces of state a tracker owns: what is currently allocated, and
//! every free we couldn't match up.
//!
//! Neither structure does any locking of its own. [`Tracker`] wraps both in a
//! single mutex, so the pair always moves together.
//!
//! [`Tracker`]: crate::tracker::Tracker

use hashbrown::HashMap;

use crate::alloc::meta::{Allocation, InvalidFree};

/// Address -> currently live [`Allocation`]. There is at most one entry per
/// address; allocating at an address that is still live replaces the old
/// record (the allocator reused it, we believe the allocator).
#[derive(Debug, Default)]
pub struct LiveLedger {
    /// The `u64` is an insertion sequence number, so we can hand entries back
    /// in the order they were allocated rather than hash order.
    entries: HashMap<usize, (u64, Allocation)>,
    next_seq: u64,
}

impl LiveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `alloc` at `alloc.pointer`, returning whatever was there before.
    /// An overwrite counts as a fresh insertion for ordering purposes.
    pub fn insert(&mut self, alloc: Allocation) -> Option<Allocation> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(alloc.pointer, (seq, alloc))
            .map(|(_, prior)| prior)
    }

    /// Remove the entry at `pointer`. Returns `true` if there was one, which
    /// is exactly the "was this a valid free?" signal.
    pub fn remove(&mut self, pointer: usize) -> bool {
        self.entries.remove(&pointer).is_some()
    }

    pub fn get(&self, pointer: usize) -> Option<&Allocation> {
        self.entries.get(&pointer).map(|(_, alloc)| alloc)
    }

    pub fn contains(&self, pointer: usize) -> bool {
        self.entries.contains_key(&pointer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All live allocations, oldest insertion first. This is O(n log n).
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        let mut ordered: Vec<&(u64, Allocation)> = self.entries.values().collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, alloc)| alloc)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }
}

/// Append-only, in order of detection.
#[derive(Debug, Default)]
pub struct InvalidFreeLog {
    frees: Vec<InvalidFree>,
}

impl InvalidFreeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, free: InvalidFree) {
        self.frees.push(free);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InvalidFree> {
        self.frees.iter()
    }

    pub fn as_slice(&self) -> &[InvalidFree] {
        &self.frees
    }

    pub fn len(&self) -> usize {
        self.frees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frees.is_empty()
    }

    pub fn clear(&mut self) {
        self.frees.clear();
    }
}
