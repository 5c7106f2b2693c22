//! # B+Tree Algorithms
//!
//! Search, insertion with node splitting, and deletion with
//! borrow-or-merge rebalancing. The tree operates on page numbers resolved
//! through the pager on every access; no in-memory pointers between nodes
//! exist, so eviction can never invalidate a reference.
//!
//! ## Insert
//!
//! ```text
//! 1. Descend from the root to the leaf covering the key
//! 2. Room in the leaf: shift the tail right, write the cell
//! 3. Leaf full: split it, link the new leaf into the chain, and insert
//!    the new sibling into the parent
//! 4. Parent full: split the parent the same way, recursing upward
//! 5. Splitting the root copies it to a fresh left-child page and rebuilds
//!    page 0 as a one-key internal node (the root page number is fixed)
//! ```
//!
//! ## Delete
//!
//! ```text
//! 1. Find the leaf cell holding the key; shift the tail left
//! 2. If the leaf's max key changed, rewrite the separator tracking it
//!    (climbing past ancestors that hold this subtree as right child)
//! 3. Leaf below 7 cells: borrow a cell from the adjacent sibling if it
//!    has spares, else merge into it and delete the leaf from the parent
//! 4. An internal node left without keys rebalances the same way, one
//!    child and one separator at a time
//! 5. A one-key root whose children merge collapses one level: the
//!    surviving node's bytes are copied over page 0
//! ```
//!
//! Separator maintenance is the subtle part. A node that is its parent's
//! right child has no separator in the parent; the key tracking its subtree
//! lives in the first ancestor that reaches the subtree through a cell
//! rather than a right-child link. [`BTree::update_ancestor_key`] walks
//! that spine.
//!
//! ## Pinning
//!
//! Public operations pin their search path in the caller's [`PinScope`].
//! Each splitting or rebalancing stage, and every unbounded descent
//! (max-key lookup, chain repair, the renderer), opens its own short-lived
//! scope and releases it before the next stage recurses. A cascade that
//! climbs the whole tree therefore holds only one stage's pages pinned at
//! a time, which is what keeps an operation inside the cache's ten slots.

use eyre::{ensure, Result};

use crate::row::Row;
use crate::storage::{Pager, PinScope, INVALID_PAGE};

use super::cursor::Cursor;
use super::interior::{InternalNode, InternalNodeMut, INTERNAL_MAX_KEYS, INTERNAL_MIN_KEYS};
use super::leaf::{
    LeafNode, LeafNodeMut, LEAF_CELL_SIZE, LEAF_LEFT_SPLIT_COUNT, LEAF_MAX_CELLS, LEAF_MIN_CELLS,
    LEAF_RIGHT_SPLIT_COUNT,
};
use super::node::{NodeHeader, NodeType};

/// The root always lives at page 0.
pub const ROOT_PAGE: u32 = 0;

/// Result of an insert: duplicate keys are reported, not overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateKey,
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    KeyNotFound,
}

/// The B+tree, borrowing the pager for the duration of one operation set.
pub struct BTree<'a> {
    pager: &'a mut Pager,
    root_page: u32,
}

impl<'a> BTree<'a> {
    pub fn new(pager: &'a mut Pager) -> Self {
        Self {
            pager,
            root_page: ROOT_PAGE,
        }
    }

    /// Initializes page 0 as an empty root leaf. Called once on a fresh
    /// database file.
    pub fn bootstrap(&mut self, scope: &mut PinScope) -> Result<()> {
        let page = self.pager.page(self.root_page, scope)?;
        let mut root = LeafNodeMut::init(page)?;
        root.set_root(true);
        Ok(())
    }

    /// Returns a cursor at `key`'s position: the cell holding the key when
    /// present, else the cell where it would be inserted.
    pub fn find(&mut self, key: u32, scope: &mut PinScope) -> Result<Cursor> {
        let mut page_num = self.root_page;
        loop {
            match self.node_kind(page_num, scope)? {
                NodeType::Leaf => return self.leaf_find(page_num, key, scope),
                NodeType::Internal => {
                    page_num = {
                        let page = self.pager.page(page_num, scope)?;
                        let node = InternalNode::from_page(page)?;
                        let child_index = node.find_child(key)?;
                        node.child_at(child_index)?
                    };
                }
            }
        }
    }

    /// Returns a cursor at the smallest key.
    pub fn start(&mut self, scope: &mut PinScope) -> Result<Cursor> {
        let mut cursor = self.find(0, scope)?;
        let num_cells = {
            let page = self.pager.page(cursor.page_num, scope)?;
            LeafNode::from_page(page)?.num_cells()
        };
        cursor.end_of_table = num_cells == 0;
        Ok(cursor)
    }

    /// Point lookup: the row with exactly this key, if present.
    pub fn find_row(&mut self, key: u32, scope: &mut PinScope) -> Result<Option<Row>> {
        let cursor = self.find(key, scope)?;
        let page = self.pager.page(cursor.page_num, scope)?;
        let leaf = LeafNode::from_page(page)?;
        if cursor.cell_num < leaf.num_cells() && leaf.key_at(cursor.cell_num)? == key {
            Ok(Some(Row::read_from(leaf.row_bytes_at(cursor.cell_num)?)?))
        } else {
            Ok(None)
        }
    }

    /// Decodes the row at the cursor position.
    pub fn read_row(&mut self, cursor: &Cursor, scope: &mut PinScope) -> Result<Row> {
        let page = self.pager.page(cursor.page_num, scope)?;
        let leaf = LeafNode::from_page(page)?;
        Row::read_from(leaf.row_bytes_at(cursor.cell_num)?)
    }

    /// Steps the cursor to the next row, following the leaf chain.
    pub fn advance(&mut self, cursor: &mut Cursor, scope: &mut PinScope) -> Result<()> {
        let (num_cells, next_leaf) = {
            let page = self.pager.page(cursor.page_num, scope)?;
            let leaf = LeafNode::from_page(page)?;
            (leaf.num_cells(), leaf.next_leaf())
        };

        cursor.cell_num += 1;
        if cursor.cell_num >= num_cells {
            if next_leaf == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next_leaf;
                cursor.cell_num = 0;
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, row: &Row, scope: &mut PinScope) -> Result<InsertOutcome> {
        let cursor = self.find(row.id, scope)?;

        let duplicate = {
            let page = self.pager.page(cursor.page_num, scope)?;
            let leaf = LeafNode::from_page(page)?;
            cursor.cell_num < leaf.num_cells() && leaf.key_at(cursor.cell_num)? == row.id
        };
        if duplicate {
            return Ok(InsertOutcome::DuplicateKey);
        }

        self.leaf_insert(&cursor, row.id, row, scope)?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn delete(&mut self, key: u32, scope: &mut PinScope) -> Result<DeleteOutcome> {
        let cursor = self.find(key, scope)?;

        let found = {
            let page = self.pager.page(cursor.page_num, scope)?;
            let leaf = LeafNode::from_page(page)?;
            cursor.cell_num < leaf.num_cells() && leaf.key_at(cursor.cell_num)? == key
        };
        if !found {
            return Ok(DeleteOutcome::KeyNotFound);
        }

        self.leaf_delete(&cursor, scope)?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Renders the tree for the debug command, one node per line.
    pub fn render(&mut self) -> Result<String> {
        let mut out = String::new();
        self.render_node(self.root_page, 0, &mut out)?;
        Ok(out)
    }

    fn leaf_find(&mut self, page_num: u32, key: u32, scope: &mut PinScope) -> Result<Cursor> {
        let page = self.pager.page(page_num, scope)?;
        let cell_num = LeafNode::from_page(page)?.find(key)?;
        Ok(Cursor::new(page_num, cell_num))
    }

    fn leaf_insert(
        &mut self,
        cursor: &Cursor,
        key: u32,
        row: &Row,
        scope: &mut PinScope,
    ) -> Result<()> {
        let num_cells = {
            let page = self.pager.page(cursor.page_num, scope)?;
            LeafNode::from_page(page)?.num_cells()
        };
        if num_cells >= LEAF_MAX_CELLS as u32 {
            return self.leaf_split_insert(cursor, key, row, scope);
        }

        let page = self.pager.page(cursor.page_num, scope)?;
        let mut leaf = LeafNodeMut::from_page(page)?;
        let mut i = num_cells;
        while i > cursor.cell_num {
            leaf.copy_cell(i, i - 1)?;
            i -= 1;
        }
        leaf.set_num_cells(num_cells + 1);
        leaf.set_key_at(cursor.cell_num, key)?;
        row.write_to(leaf.row_bytes_mut(cursor.cell_num)?)?;
        Ok(())
    }

    /// Splits a full leaf around an insertion: the combined fourteen cells
    /// are divided evenly, the new leaf takes the upper half and the old
    /// leaf's place in the chain, and the parent learns about both.
    fn leaf_split_insert(
        &mut self,
        cursor: &Cursor,
        key: u32,
        row: &Row,
        scope: &mut PinScope,
    ) -> Result<()> {
        let old_max = self.max_key(cursor.page_num)?;

        let (old_parent, old_next_leaf, old_is_root, mut cells) = {
            let page = self.pager.page(cursor.page_num, scope)?;
            let leaf = LeafNode::from_page(page)?;
            let mut cells: Vec<[u8; LEAF_CELL_SIZE]> = Vec::with_capacity(LEAF_MAX_CELLS + 1);
            for i in 0..leaf.num_cells() {
                let mut cell = [0u8; LEAF_CELL_SIZE];
                cell.copy_from_slice(leaf.cell_bytes_at(i)?);
                cells.push(cell);
            }
            (leaf.parent(), leaf.next_leaf(), leaf.is_root(), cells)
        };

        let mut new_cell = [0u8; LEAF_CELL_SIZE];
        new_cell[..4].copy_from_slice(&key.to_le_bytes());
        row.write_to(&mut new_cell[4..])?;
        cells.insert(cursor.cell_num as usize, new_cell);

        let new_page_num = self.pager.unused_page_num();

        {
            let page = self.pager.page(new_page_num, scope)?;
            let mut new_leaf = LeafNodeMut::init(page)?;
            new_leaf.set_parent(old_parent);
            new_leaf.set_next_leaf(old_next_leaf);
            for (i, cell) in cells[LEAF_LEFT_SPLIT_COUNT..].iter().enumerate() {
                new_leaf.set_cell_bytes(i as u32, cell)?;
            }
            new_leaf.set_num_cells(LEAF_RIGHT_SPLIT_COUNT as u32);
        }

        {
            let page = self.pager.page(cursor.page_num, scope)?;
            let mut old_leaf = LeafNodeMut::from_page(page)?;
            for (i, cell) in cells[..LEAF_LEFT_SPLIT_COUNT].iter().enumerate() {
                old_leaf.set_cell_bytes(i as u32, cell)?;
            }
            old_leaf.set_num_cells(LEAF_LEFT_SPLIT_COUNT as u32);
            old_leaf.set_next_leaf(new_page_num);
        }

        if old_is_root {
            self.create_new_root(new_page_num)
        } else {
            let new_max = self.max_key(cursor.page_num)?;
            self.update_internal_key(old_parent, old_max, new_max)?;
            self.internal_insert(old_parent, new_page_num)
        }
    }

    /// Splits the root without moving it: the old root's bytes go to a
    /// fresh left-child page, and page 0 is rebuilt as an internal node
    /// over the two children.
    fn create_new_root(&mut self, right_child_page: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.create_new_root_in(right_child_page, &mut scope);
        self.pager.release(scope);
        result
    }

    fn create_new_root_in(&mut self, right_child_page: u32, scope: &mut PinScope) -> Result<()> {
        let root_kind = self.node_kind(self.root_page, scope)?;

        // The right child may be a fresh page number no page() call has
        // touched yet; fetch it first, or unused_page_num hands the same
        // number to the left child.
        self.pager.page(right_child_page, scope)?;
        let left_child_page = self.pager.unused_page_num();

        if root_kind == NodeType::Internal {
            // an internal root split hands us an uninitialized right child
            let page = self.pager.page(right_child_page, scope)?;
            InternalNodeMut::init(page)?;
            let page = self.pager.page(left_child_page, scope)?;
            InternalNodeMut::init(page)?;
        }

        let root_bytes = {
            let page = self.pager.page(self.root_page, scope)?;
            *page
        };
        {
            let page = self.pager.page(left_child_page, scope)?;
            *page = root_bytes;
            NodeHeader::from_bytes_mut(page)?.set_root(false);
        }

        if root_kind == NodeType::Internal {
            // the copied node's children still point at page 0
            let children = {
                let page = self.pager.page(left_child_page, scope)?;
                let node = InternalNode::from_page(page)?;
                let mut children = Vec::with_capacity(node.num_keys() as usize + 1);
                for i in 0..=node.num_keys() {
                    children.push(node.child_at(i)?);
                }
                children
            };
            for child in children {
                self.set_node_parent(child, left_child_page, scope)?;
            }
        }

        let left_max = self.max_key(left_child_page)?;

        {
            let page = self.pager.page(self.root_page, scope)?;
            let mut root = InternalNodeMut::init(page)?;
            root.set_root(true);
            root.set_num_keys(1);
            root.set_cell(0, left_child_page, left_max)?;
            root.set_right_child(right_child_page);
        }

        self.set_node_parent(left_child_page, self.root_page, scope)?;
        self.set_node_parent(right_child_page, self.root_page, scope)?;
        Ok(())
    }

    /// Adds `child_page` under `parent_page`, keyed by the child's max key.
    fn internal_insert(&mut self, parent_page: u32, child_page: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.internal_insert_in(parent_page, child_page, &mut scope);
        self.pager.release(scope);
        result
    }

    fn internal_insert_in(
        &mut self,
        parent_page: u32,
        child_page: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        let child_max = self.max_key(child_page)?;

        let (num_keys, index, right_child_page) = {
            let page = self.pager.page(parent_page, scope)?;
            let parent = InternalNode::from_page(page)?;
            (
                parent.num_keys(),
                parent.find_child(child_max)?,
                parent.right_child(),
            )
        };

        if num_keys >= INTERNAL_MAX_KEYS as u32 {
            return self.internal_split_insert(parent_page, child_page);
        }

        if right_child_page == INVALID_PAGE {
            // empty node: the first child becomes the right child
            let page = self.pager.page(parent_page, scope)?;
            InternalNodeMut::from_page(page)?.set_right_child(child_page);
            return Ok(());
        }

        let right_max = self.max_key(right_child_page)?;

        let page = self.pager.page(parent_page, scope)?;
        let mut parent = InternalNodeMut::from_page(page)?;
        // incrementing first keeps the appended cell inside the counted
        // range; the node is known not to be full here
        parent.set_num_keys(num_keys + 1);

        if child_max > right_max {
            // the child supersedes the right child
            parent.set_cell(num_keys, right_child_page, right_max)?;
            parent.set_right_child(child_page);
        } else {
            let mut i = num_keys;
            while i > index {
                parent.copy_cell(i, i - 1)?;
                i -= 1;
            }
            parent.set_cell(index, child_page, child_max)?;
        }
        Ok(())
    }

    /// Splits a full internal node. The upper half of its children move to
    /// a new sibling, the pending child lands on whichever side covers its
    /// key range, and the parent absorbs the new sibling.
    fn internal_split_insert(&mut self, page_num: u32, child_page: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.internal_split_insert_in(page_num, child_page, &mut scope);
        self.pager.release(scope);
        result
    }

    fn internal_split_insert_in(
        &mut self,
        page_num: u32,
        child_page: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        let mut old_page = page_num;
        let old_max = self.max_key(old_page)?;
        let child_max = self.max_key(child_page)?;
        let new_page = self.pager.unused_page_num();
        let splitting_root = self.node_is_root(old_page, scope)?;

        // Splitting the root recreates it first; afterwards the node being
        // split is the root's new left child, not page 0.
        let parent_page;
        if splitting_root {
            self.create_new_root(new_page)?;
            parent_page = self.root_page;
            old_page = {
                let page = self.pager.page(self.root_page, scope)?;
                InternalNode::from_page(page)?.child_at(0)?
            };
        } else {
            parent_page = self.node_parent(old_page, scope)?;
            let page = self.pager.page(new_page, scope)?;
            InternalNodeMut::init(page)?;
        }

        // The old right child moves over first; the empty-node case in
        // internal_insert adopts it as the new node's right child.
        let right_page = {
            let page = self.pager.page(old_page, scope)?;
            let node = InternalNode::from_page(page)?;
            node.child_at(node.num_keys())?
        };
        self.internal_insert(new_page, right_page)?;
        self.set_node_parent(right_page, new_page, scope)?;
        {
            let page = self.pager.page(old_page, scope)?;
            InternalNodeMut::from_page(page)?.set_right_child(INVALID_PAGE);
        }

        // Then every cell above the middle.
        for i in ((INTERNAL_MAX_KEYS / 2 + 1)..INTERNAL_MAX_KEYS).rev() {
            let moved = {
                let page = self.pager.page(old_page, scope)?;
                InternalNode::from_page(page)?.child_at(i as u32)?
            };
            self.internal_insert(new_page, moved)?;
            self.set_node_parent(moved, new_page, scope)?;

            let page = self.pager.page(old_page, scope)?;
            let mut node = InternalNodeMut::from_page(page)?;
            let num_keys = node.num_keys();
            node.set_num_keys(num_keys - 1);
        }

        // The highest remaining cell's child becomes the old node's right
        // child.
        {
            let page = self.pager.page(old_page, scope)?;
            let mut node = InternalNodeMut::from_page(page)?;
            let num_keys = node.num_keys();
            let promoted = node.child_in_cell_at(num_keys - 1)?;
            node.set_right_child(promoted);
            node.set_num_keys(num_keys - 1);
        }

        let max_after_split = self.max_key(old_page)?;
        let destination = if child_max < max_after_split {
            old_page
        } else {
            new_page
        };
        self.internal_insert(destination, child_page)?;
        self.set_node_parent(child_page, destination, scope)?;

        let old_new_max = self.max_key(old_page)?;
        self.update_internal_key(parent_page, old_max, old_new_max)?;

        if !splitting_root {
            self.internal_insert(parent_page, new_page)?;
            self.set_node_parent(new_page, parent_page, scope)?;
        }
        Ok(())
    }

    fn leaf_delete(&mut self, cursor: &Cursor, scope: &mut PinScope) -> Result<()> {
        let (num_cells, node_is_root) = {
            let page = self.pager.page(cursor.page_num, scope)?;
            let leaf = LeafNode::from_page(page)?;
            (leaf.num_cells(), leaf.is_root())
        };

        if cursor.cell_num + 1 < num_cells {
            let page = self.pager.page(cursor.page_num, scope)?;
            let mut leaf = LeafNodeMut::from_page(page)?;
            for i in cursor.cell_num..num_cells - 1 {
                leaf.copy_cell(i, i + 1)?;
            }
        } else if cursor.cell_num + 1 == num_cells && !node_is_root {
            // dropping the last cell lowers this leaf's max key; the
            // separator tracking it lives in an ancestor
            let old_max = self.max_key(cursor.page_num)?;
            let new_max = {
                let page = self.pager.page(cursor.page_num, scope)?;
                LeafNode::from_page(page)?.key_at(cursor.cell_num - 1)?
            };
            self.update_ancestor_key(cursor.page_num, old_max, new_max)?;
        }

        {
            let page = self.pager.page(cursor.page_num, scope)?;
            LeafNodeMut::from_page(page)?.set_num_cells(num_cells - 1);
        }

        if num_cells - 1 < LEAF_MIN_CELLS as u32 && !node_is_root {
            self.leaf_rebalance(cursor)?;
        }
        Ok(())
    }

    /// Restores the minimum cell count of an underfull leaf: borrow from
    /// the adjacent sibling when it has spares, merge into it otherwise.
    fn leaf_rebalance(&mut self, cursor: &Cursor) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.leaf_rebalance_in(cursor, &mut scope);
        self.pager.release(scope);
        result
    }

    fn leaf_rebalance_in(&mut self, cursor: &Cursor, scope: &mut PinScope) -> Result<()> {
        let node_page = cursor.page_num;
        let node_max = self.max_key(node_page)?;
        let parent_page = self.node_parent(node_page, scope)?;

        let (parent_num_keys, parent_is_root, index) = {
            let page = self.pager.page(parent_page, scope)?;
            let parent = InternalNode::from_page(page)?;
            (
                parent.num_keys(),
                parent.is_root(),
                parent.find_child(node_max)?,
            )
        };

        // The parent's right child leans on its left neighbor; every other
        // child leans on its right neighbor.
        let sibling_index = if index == parent_num_keys {
            index - 1
        } else {
            index + 1
        };
        let sibling_page = {
            let page = self.pager.page(parent_page, scope)?;
            InternalNode::from_page(page)?.child_at(sibling_index)?
        };

        let sibling_old_max = self.max_key(sibling_page)?;
        let sibling_cells = {
            let page = self.pager.page(sibling_page, scope)?;
            LeafNode::from_page(page)?.num_cells()
        };

        if sibling_cells > LEAF_MIN_CELLS as u32 {
            // Borrow the sibling cell adjacent to this node.
            let borrow_index = if sibling_index < index {
                sibling_cells - 1
            } else {
                0
            };
            let (borrow_key, borrow_row) = {
                let page = self.pager.page(sibling_page, scope)?;
                let sibling = LeafNode::from_page(page)?;
                (
                    sibling.key_at(borrow_index)?,
                    Row::read_from(sibling.row_bytes_at(borrow_index)?)?,
                )
            };

            let insert_cursor = self.leaf_find(node_page, borrow_key, scope)?;
            self.leaf_insert(&insert_cursor, borrow_key, &borrow_row, scope)?;
            let node_new_max = self.max_key(node_page)?;
            self.update_ancestor_key(node_page, node_max, node_new_max)?;

            // Removing the borrowed cell leaves the sibling at or above the
            // minimum, so this delete cannot cascade.
            let delete_cursor = self.leaf_find(sibling_page, borrow_key, scope)?;
            self.leaf_delete(&delete_cursor, scope)?;
            return Ok(());
        }

        // The sibling sits at the minimum: move every cell of this node
        // into it.
        let (node_rows, node_next_leaf) = {
            let page = self.pager.page(node_page, scope)?;
            let leaf = LeafNode::from_page(page)?;
            let mut rows = Vec::with_capacity(leaf.num_cells() as usize);
            for i in 0..leaf.num_cells() {
                rows.push((leaf.key_at(i)?, Row::read_from(leaf.row_bytes_at(i)?)?));
            }
            (rows, leaf.next_leaf())
        };
        for (key, row) in &node_rows {
            let insert_cursor = self.leaf_find(sibling_page, *key, scope)?;
            self.leaf_insert(&insert_cursor, *key, row, scope)?;
        }

        if parent_num_keys == 1 && parent_is_root {
            // Two leaves under a one-key root become a single root leaf.
            let sibling_bytes = {
                let page = self.pager.page(sibling_page, scope)?;
                *page
            };
            {
                let page = self.pager.page(self.root_page, scope)?;
                *page = sibling_bytes;
                let mut root = LeafNodeMut::from_page(page)?;
                root.set_root(true);
                root.set_next_leaf(0);
            }
            self.pager.free_page(sibling_page);
            self.pager.free_page(node_page);
            return Ok(());
        }

        let sibling_new_max = self.max_key(sibling_page)?;
        self.update_ancestor_key(node_page, sibling_old_max, sibling_new_max)?;

        if index == parent_num_keys {
            // The rightmost leaf vanished; its left sibling inherits the
            // tail of the chain.
            let page = self.pager.page(sibling_page, scope)?;
            LeafNodeMut::from_page(page)?.set_next_leaf(node_next_leaf);
        } else {
            self.repair_leaf_chain(parent_page, node_page, index, sibling_page)?;
        }

        self.internal_delete(parent_page, node_page, index)
    }

    /// Retargets the leaf whose `next_leaf` points at the disappearing
    /// `node_page`. The predecessor is the parent's previous child when one
    /// exists; only a leaf that is its parent's first child needs the walk
    /// from the start of the chain.
    fn repair_leaf_chain(
        &mut self,
        parent_page: u32,
        node_page: u32,
        index: u32,
        successor_page: u32,
    ) -> Result<()> {
        let mut scope = PinScope::new();
        let result =
            self.repair_leaf_chain_in(parent_page, node_page, index, successor_page, &mut scope);
        self.pager.release(scope);
        result
    }

    fn repair_leaf_chain_in(
        &mut self,
        parent_page: u32,
        node_page: u32,
        index: u32,
        successor_page: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        if index > 0 {
            let pred_page = {
                let page = self.pager.page(parent_page, scope)?;
                InternalNode::from_page(page)?.child_at(index - 1)?
            };
            let page = self.pager.page(pred_page, scope)?;
            LeafNodeMut::from_page(page)?.set_next_leaf(successor_page);
            return Ok(());
        }

        // The predecessor lives under an adjacent subtree; walk the chain
        // from the first leaf.
        let mut current = self.find(0, scope)?.page_num;
        if current == node_page {
            // leftmost leaf of the tree: nothing points at it
            return Ok(());
        }
        loop {
            let next = {
                let page = self.pager.page(current, scope)?;
                LeafNode::from_page(page)?.next_leaf()
            };
            ensure!(next != 0, "leaf chain never reaches page {}", node_page);
            if next == node_page {
                let page = self.pager.page(current, scope)?;
                LeafNodeMut::from_page(page)?.set_next_leaf(successor_page);
                return Ok(());
            }
            current = next;
        }
    }

    /// Removes the child at `index` from `parent_page` and recycles its
    /// page, rebalancing the parent if it runs out of keys.
    fn internal_delete(&mut self, parent_page: u32, child_page: u32, index: u32) -> Result<()> {
        let remaining = self.internal_detach(parent_page, child_page, index)?;
        self.pager.free_page(child_page);

        let parent_is_root = {
            let mut scope = PinScope::new();
            let result = self.node_is_root(parent_page, &mut scope);
            self.pager.release(scope);
            result?
        };
        if remaining < INTERNAL_MIN_KEYS as u32 && !parent_is_root {
            self.internal_rebalance(parent_page)?;
        }
        Ok(())
    }

    /// Unlinks the child at `index` from `parent_page` without recycling
    /// its page, returning the parent's remaining key count. The borrow
    /// path uses this directly: a transferred child stays live and must
    /// never touch the free stack.
    fn internal_detach(&mut self, parent_page: u32, child_page: u32, index: u32) -> Result<u32> {
        let mut scope = PinScope::new();
        let result = self.internal_detach_in(parent_page, child_page, index, &mut scope);
        self.pager.release(scope);
        result
    }

    fn internal_detach_in(
        &mut self,
        parent_page: u32,
        child_page: u32,
        index: u32,
        scope: &mut PinScope,
    ) -> Result<u32> {
        let num_keys = {
            let page = self.pager.page(parent_page, scope)?;
            InternalNode::from_page(page)?.num_keys()
        };
        let removed_was_right = index == num_keys;

        if removed_was_right {
            let promoted = {
                let page = self.pager.page(parent_page, scope)?;
                InternalNode::from_page(page)?.child_at(index - 1)?
            };
            {
                let page = self.pager.page(parent_page, scope)?;
                InternalNodeMut::from_page(page)?.set_right_child(promoted);
            }
            // the parent's own max fell with its right child; the separator
            // tracking this subtree lives in an ancestor
            let old_max = self.max_key(child_page)?;
            let new_max = self.max_key(promoted)?;
            self.update_ancestor_key(parent_page, old_max, new_max)?;
        } else {
            let page = self.pager.page(parent_page, scope)?;
            let mut parent = InternalNodeMut::from_page(page)?;
            for i in index..num_keys - 1 {
                parent.copy_cell(i, i + 1)?;
            }
        }

        {
            let page = self.pager.page(parent_page, scope)?;
            InternalNodeMut::from_page(page)?.set_num_keys(num_keys - 1);
        }
        Ok(num_keys - 1)
    }

    /// Restores an internal node left without keys: borrow a child from the
    /// adjacent sibling when it has spares, merge into it otherwise.
    fn internal_rebalance(&mut self, node_page: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.internal_rebalance_in(node_page, &mut scope);
        self.pager.release(scope);
        result
    }

    fn internal_rebalance_in(&mut self, node_page: u32, scope: &mut PinScope) -> Result<()> {
        let parent_page = self.node_parent(node_page, scope)?;
        let node_max = self.max_key(node_page)?;
        let child_page = {
            let page = self.pager.page(node_page, scope)?;
            let node = InternalNode::from_page(page)?;
            // the underfull node holds exactly one child, as right child
            node.child_at(node.num_keys())?
        };

        let (parent_num_keys, parent_is_root, index) = {
            let page = self.pager.page(parent_page, scope)?;
            let parent = InternalNode::from_page(page)?;
            (
                parent.num_keys(),
                parent.is_root(),
                parent.find_child(node_max)?,
            )
        };

        let sibling_index = if index == parent_num_keys {
            index - 1
        } else {
            index + 1
        };
        let sibling_page = {
            let page = self.pager.page(parent_page, scope)?;
            InternalNode::from_page(page)?.child_at(sibling_index)?
        };
        let sibling_keys = {
            let page = self.pager.page(sibling_page, scope)?;
            InternalNode::from_page(page)?.num_keys()
        };

        if sibling_keys > INTERNAL_MIN_KEYS as u32 {
            // Borrow the sibling child adjacent to this node.
            let sibling_cell = if sibling_index < index { sibling_keys } else { 0 };
            let source_page = {
                let page = self.pager.page(sibling_page, scope)?;
                InternalNode::from_page(page)?.child_at(sibling_cell)?
            };
            self.set_node_parent(source_page, node_page, scope)?;
            {
                let page = self.pager.page(node_page, scope)?;
                InternalNodeMut::from_page(page)?.set_num_keys(1);
            }

            let source_max = self.max_key(source_page)?;
            let child_max = self.max_key(child_page)?;

            if source_max > child_max {
                // borrowed from the right: the old child becomes cell 0 and
                // the borrowed child the new right child
                {
                    let page = self.pager.page(node_page, scope)?;
                    let mut node = InternalNodeMut::from_page(page)?;
                    node.set_cell(0, child_page, child_max)?;
                    node.set_right_child(source_page);
                }
                self.update_ancestor_key(node_page, child_max, source_max)?;
            } else {
                // borrowed from the left: it slots in before the old child
                let page = self.pager.page(node_page, scope)?;
                InternalNodeMut::from_page(page)?.set_cell(0, source_page, source_max)?;
            }

            // Detach the borrowed child from the sibling without recycling
            // it; the sibling keeps at least one key, so no rebalance
            // follows.
            self.internal_detach(sibling_page, source_page, sibling_cell)?;
            return Ok(());
        }

        if parent_num_keys == 1 && parent_is_root {
            // Two one-key children under a one-key root: fold everything
            // into the sibling and copy it over page 0, dropping a level.
            self.internal_insert(sibling_page, child_page)?;
            let children = {
                let page = self.pager.page(sibling_page, scope)?;
                let sibling = InternalNode::from_page(page)?;
                let mut children = Vec::with_capacity(sibling.num_keys() as usize + 1);
                for i in 0..=sibling.num_keys() {
                    children.push(sibling.child_at(i)?);
                }
                children
            };
            for child in children {
                self.set_node_parent(child, parent_page, scope)?;
            }
            let sibling_bytes = {
                let page = self.pager.page(sibling_page, scope)?;
                *page
            };
            {
                let page = self.pager.page(parent_page, scope)?;
                *page = sibling_bytes;
                NodeHeader::from_bytes_mut(page)?.set_root(true);
            }
            self.pager.free_page(sibling_page);
            self.pager.free_page(node_page);
            return Ok(());
        }

        // Fold the node's only child into the sibling and drop the node.
        self.internal_insert(sibling_page, child_page)?;
        self.set_node_parent(child_page, sibling_page, scope)?;
        self.internal_delete(parent_page, node_page, index)
    }

    /// Rewrites the separator found by `old_key` in one node. When the old
    /// key exceeds every separator, the subtree is tracked through the
    /// right child and there is no cell to rewrite.
    fn update_internal_key(&mut self, node_page: u32, old_key: u32, new_key: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.update_internal_key_in(node_page, old_key, new_key, &mut scope);
        self.pager.release(scope);
        result
    }

    fn update_internal_key_in(
        &mut self,
        node_page: u32,
        old_key: u32,
        new_key: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        let (index, num_keys) = {
            let page = self.pager.page(node_page, scope)?;
            let node = InternalNode::from_page(page)?;
            (node.find_child(old_key)?, node.num_keys())
        };
        if index < num_keys {
            let page = self.pager.page(node_page, scope)?;
            InternalNodeMut::from_page(page)?.set_key_at(index, new_key)?;
        }
        Ok(())
    }

    /// After `child_page`'s subtree max changed from `old_key` to
    /// `new_key`, rewrites the separator in the ancestor that tracks the
    /// subtree: the first one reached through a cell rather than a
    /// right-child link. A spine that runs to the root has no separator.
    fn update_ancestor_key(&mut self, child_page: u32, old_key: u32, new_key: u32) -> Result<()> {
        let mut scope = PinScope::new();
        let result = self.update_ancestor_key_in(child_page, old_key, new_key, &mut scope);
        self.pager.release(scope);
        result
    }

    fn update_ancestor_key_in(
        &mut self,
        child_page: u32,
        old_key: u32,
        new_key: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        let mut child = child_page;
        loop {
            if self.node_is_root(child, scope)? {
                return Ok(());
            }
            let parent_page = self.node_parent(child, scope)?;
            let (right_child, parent_is_root) = {
                let page = self.pager.page(parent_page, scope)?;
                let node = InternalNode::from_page(page)?;
                (node.right_child(), node.is_root())
            };
            if right_child == child && !parent_is_root {
                child = parent_page;
                continue;
            }
            return self.update_internal_key_in(parent_page, old_key, new_key, scope);
        }
    }

    /// Maximum key in the subtree rooted at `page_num`, found by walking
    /// right children down to a leaf. Pins are local to the walk.
    fn max_key(&mut self, page_num: u32) -> Result<u32> {
        let mut scope = PinScope::new();
        let result = self.max_key_in(page_num, &mut scope);
        self.pager.release(scope);
        result
    }

    fn max_key_in(&mut self, mut page_num: u32, scope: &mut PinScope) -> Result<u32> {
        loop {
            let page = self.pager.page(page_num, scope)?;
            match NodeHeader::from_bytes(page)?.node_type()? {
                NodeType::Leaf => return LeafNode::from_page(page)?.max_key(),
                NodeType::Internal => {
                    let node = InternalNode::from_page(page)?;
                    page_num = node.child_at(node.num_keys())?;
                }
            }
        }
    }

    fn render_node(&mut self, page_num: u32, depth: usize, out: &mut String) -> Result<()> {
        let snapshot = self.snapshot_node(page_num)?;
        match snapshot {
            NodeSnapshot::Leaf { keys } => {
                indent(out, depth);
                out.push_str(&format!("- leaf (size {})\n", keys.len()));
                for key in keys {
                    indent(out, depth + 1);
                    out.push_str(&format!("- {}\n", key));
                }
            }
            NodeSnapshot::Internal { cells, right_child } => {
                indent(out, depth);
                out.push_str(&format!("- internal (size {})\n", cells.len()));
                for (child, key) in cells {
                    self.render_node(child, depth + 1, out)?;
                    indent(out, depth + 1);
                    out.push_str(&format!("- key {}\n", key));
                }
                if let Some(right) = right_child {
                    self.render_node(right, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }

    fn snapshot_node(&mut self, page_num: u32) -> Result<NodeSnapshot> {
        let mut scope = PinScope::new();
        let result = self.snapshot_node_in(page_num, &mut scope);
        self.pager.release(scope);
        result
    }

    fn snapshot_node_in(&mut self, page_num: u32, scope: &mut PinScope) -> Result<NodeSnapshot> {
        let page = self.pager.page(page_num, scope)?;
        match NodeHeader::from_bytes(page)?.node_type()? {
            NodeType::Leaf => {
                let leaf = LeafNode::from_page(page)?;
                let mut keys = Vec::with_capacity(leaf.num_cells() as usize);
                for i in 0..leaf.num_cells() {
                    keys.push(leaf.key_at(i)?);
                }
                Ok(NodeSnapshot::Leaf { keys })
            }
            NodeType::Internal => {
                let node = InternalNode::from_page(page)?;
                let mut cells = Vec::with_capacity(node.num_keys() as usize);
                for i in 0..node.num_keys() {
                    cells.push((node.child_at(i)?, node.key_at(i)?));
                }
                let right_child = if node.num_keys() > 0 {
                    Some(node.child_at(node.num_keys())?)
                } else {
                    None
                };
                Ok(NodeSnapshot::Internal { cells, right_child })
            }
        }
    }

    fn node_kind(&mut self, page_num: u32, scope: &mut PinScope) -> Result<NodeType> {
        let page = self.pager.page(page_num, scope)?;
        NodeHeader::from_bytes(page)?.node_type()
    }

    fn node_is_root(&mut self, page_num: u32, scope: &mut PinScope) -> Result<bool> {
        let page = self.pager.page(page_num, scope)?;
        Ok(NodeHeader::from_bytes(page)?.is_root())
    }

    fn node_parent(&mut self, page_num: u32, scope: &mut PinScope) -> Result<u32> {
        let page = self.pager.page(page_num, scope)?;
        Ok(NodeHeader::from_bytes(page)?.parent())
    }

    fn set_node_parent(
        &mut self,
        page_num: u32,
        parent_page: u32,
        scope: &mut PinScope,
    ) -> Result<()> {
        let page = self.pager.page(page_num, scope)?;
        NodeHeader::from_bytes_mut(page)?.set_parent(parent_page);
        Ok(())
    }
}

enum NodeSnapshot {
    Leaf {
        keys: Vec<u32>,
    },
    Internal {
        cells: Vec<(u32, u32)>,
        right_child: Option<u32>,
    },
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_pager(dir: &tempfile::TempDir) -> Pager {
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        let mut scope = PinScope::new();
        let mut tree = BTree::new(&mut pager);
        tree.bootstrap(&mut scope).unwrap();
        pager.release(scope);
        pager
    }

    fn row(id: u32) -> Row {
        Row::new(id, &format!("user{}", id), &format!("person{}@example.com", id)).unwrap()
    }

    fn insert(pager: &mut Pager, id: u32) -> InsertOutcome {
        let mut scope = PinScope::new();
        let outcome = BTree::new(pager).insert(&row(id), &mut scope).unwrap();
        pager.release(scope);
        outcome
    }

    fn delete(pager: &mut Pager, id: u32) -> DeleteOutcome {
        let mut scope = PinScope::new();
        let outcome = BTree::new(pager).delete(id, &mut scope).unwrap();
        pager.release(scope);
        outcome
    }

    fn scan_ids(pager: &mut Pager) -> Vec<u32> {
        let mut ids = Vec::new();
        let mut scope = PinScope::new();
        let mut cursor = BTree::new(pager).start(&mut scope).unwrap();
        pager.release(scope);

        while !cursor.end_of_table {
            let mut scope = PinScope::new();
            let mut tree = BTree::new(pager);
            let row = tree.read_row(&cursor, &mut scope).unwrap();
            ids.push(row.id);
            tree.advance(&mut cursor, &mut scope).unwrap();
            pager.release(scope);
        }
        ids
    }

    #[test]
    fn insert_and_scan_single_row() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        assert_eq!(insert(&mut pager, 1), InsertOutcome::Inserted);
        assert_eq!(scan_ids(&mut pager), vec![1]);
    }

    #[test]
    fn duplicate_key_is_reported_and_row_preserved() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        insert(&mut pager, 1);
        let mut scope = PinScope::new();
        let outcome = BTree::new(&mut pager)
            .insert(
                &Row::new(1, "user2", "person2@example.com").unwrap(),
                &mut scope,
            )
            .unwrap();
        pager.release(scope);

        assert_eq!(outcome, InsertOutcome::DuplicateKey);

        let mut scope = PinScope::new();
        let mut tree = BTree::new(&mut pager);
        let cursor = tree.find(1, &mut scope).unwrap();
        let row = tree.read_row(&cursor, &mut scope).unwrap();
        pager.release(scope);
        assert_eq!(row.username, "user1");
    }

    #[test]
    fn out_of_order_inserts_scan_in_key_order() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in [3, 1, 2] {
            insert(&mut pager, id);
        }

        assert_eq!(scan_ids(&mut pager), vec![1, 2, 3]);
    }

    #[test]
    fn find_positions_cursor_at_key_or_insert_point() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);
        for id in [10, 20, 30] {
            insert(&mut pager, id);
        }

        let mut scope = PinScope::new();
        let mut tree = BTree::new(&mut pager);
        assert_eq!(tree.find(20, &mut scope).unwrap().cell_num, 1);
        assert_eq!(tree.find(15, &mut scope).unwrap().cell_num, 1);
        assert_eq!(tree.find(35, &mut scope).unwrap().cell_num, 3);
        pager.release(scope);
    }

    #[test]
    fn leaf_split_keeps_all_rows_reachable() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=(LEAF_MAX_CELLS as u32 + 1) {
            insert(&mut pager, id);
        }

        let expected: Vec<u32> = (1..=(LEAF_MAX_CELLS as u32 + 1)).collect();
        assert_eq!(scan_ids(&mut pager), expected);

        // the low and high keys now live on different pages
        let mut scope = PinScope::new();
        let mut tree = BTree::new(&mut pager);
        let left = tree.find(1, &mut scope).unwrap();
        let right = tree.find(LEAF_MAX_CELLS as u32 + 1, &mut scope).unwrap();
        assert_ne!(left.page_num, right.page_num);
        pager.release(scope);
    }

    #[test]
    fn split_of_fourteen_sequential_rows_renders_balanced_tree() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=14 {
            insert(&mut pager, id);
        }

        let rendered = BTree::new(&mut pager).render().unwrap();
        let mut expected = String::from("- internal (size 1)\n  - leaf (size 7)\n");
        for id in 1..=7 {
            expected.push_str(&format!("    - {}\n", id));
        }
        expected.push_str("  - key 7\n  - leaf (size 7)\n");
        for id in 8..=14 {
            expected.push_str(&format!("    - {}\n", id));
        }
        assert_eq!(rendered, expected);
    }

    #[test]
    fn reverse_inserts_scan_in_key_order_across_splits() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in (1..=50).rev() {
            insert(&mut pager, id);
        }

        let expected: Vec<u32> = (1..=50).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn internal_root_split_keeps_rows_reachable() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=100 {
            insert(&mut pager, id);
        }

        let expected: Vec<u32> = (1..=100).collect();
        assert_eq!(scan_ids(&mut pager), expected);

        for id in 1..=100 {
            let mut scope = PinScope::new();
            let mut tree = BTree::new(&mut pager);
            let cursor = tree.find(id, &mut scope).unwrap();
            let row = tree.read_row(&cursor, &mut scope).unwrap();
            assert_eq!(row.id, id);
            pager.release(scope);
        }
    }

    #[test]
    fn delete_missing_key_reports_not_found() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        insert(&mut pager, 1);
        assert_eq!(delete(&mut pager, 2), DeleteOutcome::KeyNotFound);
        assert_eq!(scan_ids(&mut pager), vec![1]);
    }

    #[test]
    fn delete_on_empty_tree_reports_not_found() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        assert_eq!(delete(&mut pager, 0), DeleteOutcome::KeyNotFound);
        assert_eq!(delete(&mut pager, 7), DeleteOutcome::KeyNotFound);
    }

    #[test]
    fn insert_then_delete_then_find_reports_not_found() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        insert(&mut pager, 5);
        assert_eq!(delete(&mut pager, 5), DeleteOutcome::Deleted);
        assert_eq!(delete(&mut pager, 5), DeleteOutcome::KeyNotFound);
        assert_eq!(scan_ids(&mut pager), Vec::<u32>::new());
    }

    #[test]
    fn delete_middle_key_from_multi_leaf_tree() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=14 {
            insert(&mut pager, id);
        }
        assert_eq!(delete(&mut pager, 13), DeleteOutcome::Deleted);

        let expected: Vec<u32> = (1..=12).chain([14]).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn underflow_borrows_from_sibling_with_spares() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        // leaves: [1..=7] and [8..=20]
        for id in 1..=20 {
            insert(&mut pager, id);
        }

        // left leaf drops to six cells and borrows key 8 from the right
        assert_eq!(delete(&mut pager, 1), DeleteOutcome::Deleted);

        let expected: Vec<u32> = (2..=20).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn underflow_merges_when_sibling_is_at_minimum() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        // leaves: [1..=7] and [8..=14], both at the minimum
        for id in 1..=14 {
            insert(&mut pager, id);
        }

        assert_eq!(delete(&mut pager, 14), DeleteOutcome::Deleted);

        let expected: Vec<u32> = (1..=13).collect();
        assert_eq!(scan_ids(&mut pager), expected);

        // the tree collapsed back to a root leaf and recycled both pages
        let rendered = BTree::new(&mut pager).render().unwrap();
        assert!(rendered.starts_with("- leaf (size 13)"));
        assert_eq!(pager.free_stack().len(), 2);
    }

    #[test]
    fn pages_recycled_by_merge_are_reused_by_later_splits() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=14 {
            insert(&mut pager, id);
        }
        delete(&mut pager, 14);
        assert_eq!(pager.free_stack().len(), 2);

        let num_pages_before = pager.num_pages();
        insert(&mut pager, 14);
        insert(&mut pager, 15);

        // the split grabbed a recycled page instead of growing the file
        assert_eq!(pager.num_pages(), num_pages_before);
        let expected: Vec<u32> = (1..=15).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn deleting_leading_keys_triggers_merge_and_keeps_order() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=20 {
            insert(&mut pager, id);
        }
        for id in 1..=4 {
            assert_eq!(delete(&mut pager, id), DeleteOutcome::Deleted);
        }

        let expected: Vec<u32> = (5..=20).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn drain_ascending_leaves_an_empty_root_leaf() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=30 {
            insert(&mut pager, id);
        }
        for id in 1..=30 {
            assert_eq!(delete(&mut pager, id), DeleteOutcome::Deleted);
        }

        assert_eq!(scan_ids(&mut pager), Vec::<u32>::new());
        let rendered = BTree::new(&mut pager).render().unwrap();
        assert_eq!(rendered, "- leaf (size 0)\n");
    }

    #[test]
    fn drain_descending_leaves_an_empty_root_leaf() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=30 {
            insert(&mut pager, id);
        }
        for id in (1..=30).rev() {
            assert_eq!(delete(&mut pager, id), DeleteOutcome::Deleted);
        }

        assert_eq!(scan_ids(&mut pager), Vec::<u32>::new());
    }

    #[test]
    fn drain_interleaved_keeps_survivors_in_order() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=60 {
            insert(&mut pager, id);
        }
        for id in (1..=60).filter(|id| id % 3 != 0) {
            assert_eq!(delete(&mut pager, id), DeleteOutcome::Deleted);
        }

        let expected: Vec<u32> = (1..=60).filter(|id| id % 3 == 0).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn deep_tree_survives_full_drain_and_reinsert() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        for id in 1..=100 {
            insert(&mut pager, id);
        }
        for id in 1..=100 {
            assert_eq!(delete(&mut pager, id), DeleteOutcome::Deleted);
        }
        assert_eq!(scan_ids(&mut pager), Vec::<u32>::new());

        for id in (1..=40).rev() {
            insert(&mut pager, id);
        }
        let expected: Vec<u32> = (1..=40).collect();
        assert_eq!(scan_ids(&mut pager), expected);
    }

    #[test]
    fn render_empty_tree_is_a_single_empty_leaf() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let rendered = BTree::new(&mut pager).render().unwrap();
        assert_eq!(rendered, "- leaf (size 0)\n");
    }
}
