//! The records the ledger keeps about allocator events.

use serde::{Deserialize, Serialize};

use crate::serialize::serde_addr;

/// Read-only view over the fields every ledger record carries. Report
/// selectors are written against this, so the same grouping works for live
/// allocations and invalid frees alike.
pub trait AllocRecord {
    /// Requested size in bytes
    fn size(&self) -> usize;
    /// Requested alignment
    fn align(&self) -> usize;
    /// Address the allocator handed out (or was asked to free)
    fn pointer(&self) -> usize;
    /// Call-site provenance captured when the event fired
    fn stack(&self) -> &str;
}

/// One currently-live allocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    pub size: usize,
    pub align: usize,
    /// Where is this allocation?
    #[serde(with = "serde_addr")]
    pub pointer: usize,
    /// Who asked for it?
    pub stack: String,
}

impl Allocation {
    pub fn new(size: usize, align: usize, pointer: usize, stack: String) -> Self {
        Self {
            size,
            align,
            pointer,
            stack,
        }
    }
}

/// A deallocation that did not match any live allocation: a double free, a
/// free of something never allocated, or (sadly, indistinguishably) a free
/// of a reused address whose first life we already retired.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidFree {
    pub size: usize,
    pub align: usize,
    #[serde(with = "serde_addr")]
    pub pointer: usize,
    pub stack: String,
}

impl InvalidFree {
    pub fn new(size: usize, align: usize, pointer: usize, stack: String) -> Self {
        Self {
            size,
            align,
            pointer,
            stack,
        }
    }
}

macro_rules! impl_alloc_record {
    ($($ty:ty),*) => {
        $(
            impl AllocRecord for $ty {
                fn size(&self) -> usize {
                    self.size
                }

                fn align(&self) -> usize {
                    self.align
                }

                fn pointer(&self) -> usize {
                    self.pointer
                }

                fn stack(&self) -> &str {
                    &self.stack
                }
            }
        )*
    };
}

impl_alloc_record!(Allocation, InvalidFree);
