//! # B+Tree
//!
//! The B+tree over the page array. All rows live in leaf nodes; internal
//! nodes hold separator keys and child page numbers. Leaves sit at equal
//! depth and are chained through `next_leaf` for ordered scans.
//!
//! ## Node Types
//!
//! - **Leaf** ([`leaf`]): fixed-width cells of (key, row), strictly ordered
//!   by key, up to 13 per page.
//! - **Internal** ([`interior`]): (child, key) cells plus a dedicated right
//!   child, at most 3 keys so that splits and merges trigger early.
//!
//! ## Structure
//!
//! ```text
//!                  [internal, page 0 = root]
//!                  /          |            \
//!        [leaf 2]        [leaf 3]        [leaf 4]
//!           |---------------->|------------->|      next_leaf chain
//! ```
//!
//! The root is always page 0; splitting the root copies its content to a
//! fresh page and rebuilds page 0 in place, so the root's page number never
//! changes.
//!
//! ## Rebalancing
//!
//! Insertion splits full nodes upward until a non-full ancestor (or a new
//! root) absorbs the split. Deletion rebalances underfull nodes against one
//! adjacent sibling: borrow a cell when the sibling has spare capacity,
//! merge into the sibling otherwise. Leaves rebalance below seven cells,
//! internal nodes below one key.
//!
//! ## Module Organization
//!
//! - `node`: the 6-byte header prefix both node kinds share
//! - `leaf` / `interior`: typed views over page buffers
//! - `cursor`: a (page, cell) table position
//! - `tree`: search, insertion, deletion, rendering

pub mod cursor;
pub mod interior;
pub mod leaf;
pub mod node;
pub mod tree;

pub use cursor::Cursor;
pub use interior::{InternalNode, InternalNodeMut, INTERNAL_MAX_KEYS, INTERNAL_MIN_KEYS};
pub use leaf::{
    LeafNode, LeafNodeMut, LEAF_LEFT_SPLIT_COUNT, LEAF_MAX_CELLS, LEAF_MIN_CELLS,
    LEAF_RIGHT_SPLIT_COUNT,
};
pub use node::{NodeHeader, NodeType};
pub use tree::{BTree, DeleteOutcome, InsertOutcome, ROOT_PAGE};
