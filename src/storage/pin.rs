//! # Pin Scopes
//!
//! A pin scope is the per-operation record of every page pinned during a
//! tree traversal. [`crate::storage::Pager::page`] takes the scope and logs
//! each pin; [`crate::storage::Pager::release`] unpins everything the scope
//! recorded, in insertion order.
//!
//! Each top-level engine operation owns exactly one scope and passes it down
//! to its helpers; bounded read-only descents (max-key lookup, the tree
//! printer) open short-lived local scopes so a deep operation never holds
//! more pages pinned than the cache has slots.

use smallvec::SmallVec;

/// Per-operation collection of pinned page numbers.
#[derive(Debug, Default)]
pub struct PinScope {
    pages: SmallVec<[u32; 16]>,
}

impl PinScope {
    pub fn new() -> Self {
        Self {
            pages: SmallVec::new(),
        }
    }

    pub(crate) fn record(&mut self, page_num: u32) {
        self.pages.push(page_num);
    }

    pub(crate) fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
