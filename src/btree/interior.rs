//! # Internal Nodes
//!
//! Internal nodes hold separator keys and child page numbers. A node with N
//! keys has N+1 children: the first N live in the cell array, the last in
//! the dedicated `right_child` header field. The key at index i is the
//! maximum key in the subtree rooted at children[i]; keys are strictly
//! ascending.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ----------------------------------
//! 0       6     common node header
//! 6       4     num_keys
//! 10      4     right_child page number
//! 14      8     cell 0 (child u32 + key u32)
//! 22      8     cell 1
//! ...
//! ```
//!
//! The key capacity is deliberately tiny (three keys) so splits and merges
//! happen after a handful of rows. An INVALID right child marks an empty
//! node; the root page number is 0, so 0 cannot stand in for "no child"
//! here the way it does for the leaf chain.

use eyre::{bail, ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::{PageBuf, INVALID_PAGE};

use super::node::{NodeHeader, NodeType};

/// Size of the internal header (common header + num_keys + right_child).
pub const INTERNAL_HEADER_SIZE: usize = 14;

/// Size of one internal cell: a child page number and a separator key.
pub const INTERNAL_CELL_SIZE: usize = 8;

/// Maximum number of keys in one internal node. Kept small so node splits
/// are exercised by small data sets.
pub const INTERNAL_MAX_KEYS: usize = 3;

/// A non-root internal node with fewer keys than this is rebalanced.
pub const INTERNAL_MIN_KEYS: usize = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct InternalHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
    num_keys: U32,
    right_child: U32,
}

const _: () = assert!(std::mem::size_of::<InternalHeader>() == INTERNAL_HEADER_SIZE);

fn cell_offset(cell_num: u32) -> usize {
    INTERNAL_HEADER_SIZE + cell_num as usize * INTERNAL_CELL_SIZE
}

/// Read-only view of an internal page.
#[derive(Debug)]
pub struct InternalNode<'a> {
    data: &'a PageBuf,
}

/// Mutable view of an internal page.
pub struct InternalNodeMut<'a> {
    data: &'a mut PageBuf,
}

impl<'a> InternalNode<'a> {
    pub fn from_page(data: &'a PageBuf) -> Result<Self> {
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.node_type()? == NodeType::Internal,
            "expected internal node, got leaf"
        );
        Ok(Self { data })
    }

    fn header(&self) -> &InternalHeader {
        InternalHeader::ref_from_bytes(&self.data[..INTERNAL_HEADER_SIZE]).unwrap()
    }

    pub fn is_root(&self) -> bool {
        self.header().is_root != 0
    }

    pub fn parent(&self) -> u32 {
        self.header().parent.get()
    }

    pub fn num_keys(&self) -> u32 {
        self.header().num_keys.get()
    }

    pub fn right_child(&self) -> u32 {
        self.header().right_child.get()
    }

    /// Child page at `child_num`; index `num_keys` resolves to the right
    /// child. An INVALID page number here means the tree is corrupt.
    pub fn child_at(&self, child_num: u32) -> Result<u32> {
        let num_keys = self.num_keys();
        if child_num > num_keys {
            bail!(
                "tried to access child {} of a node with {} keys",
                child_num,
                num_keys
            );
        }

        let page_num = if child_num == num_keys {
            self.right_child()
        } else {
            let offset = cell_offset(child_num);
            u32::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
        };

        ensure!(
            page_num != INVALID_PAGE,
            "child {} of internal node is an invalid page",
            child_num
        );
        Ok(page_num)
    }

    pub fn key_at(&self, key_num: u32) -> Result<u32> {
        ensure!(
            key_num < self.num_keys(),
            "internal key {} out of bounds (num_keys={})",
            key_num,
            self.num_keys()
        );
        let offset = cell_offset(key_num) + 4;
        Ok(u32::from_le_bytes(
            self.data[offset..offset + 4].try_into().unwrap(),
        ))
    }

    /// Index of the child whose subtree should contain `key`: the smallest
    /// i with key[i] >= key, else `num_keys` for the right child.
    pub fn find_child(&self, key: u32) -> Result<u32> {
        let mut min_index = 0;
        let mut max_index = self.num_keys();

        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            if self.key_at(index)? >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(min_index)
    }
}

impl<'a> InternalNodeMut<'a> {
    pub fn from_page(data: &'a mut PageBuf) -> Result<Self> {
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.node_type()? == NodeType::Internal,
            "expected internal node, got leaf"
        );
        Ok(Self { data })
    }

    /// Zeroes the page and writes a fresh non-root internal header with an
    /// INVALID right child (the empty-node marker).
    pub fn init(data: &'a mut PageBuf) -> Result<Self> {
        data.fill(0);
        let header = NodeHeader::from_bytes_mut(data)?;
        header.set_node_type(NodeType::Internal);
        header.set_root(false);

        let mut node = Self { data };
        node.set_right_child(INVALID_PAGE);
        Ok(node)
    }

    fn header_mut(&mut self) -> &mut InternalHeader {
        InternalHeader::mut_from_bytes(&mut self.data[..INTERNAL_HEADER_SIZE]).unwrap()
    }

    fn header(&self) -> &InternalHeader {
        InternalHeader::ref_from_bytes(&self.data[..INTERNAL_HEADER_SIZE]).unwrap()
    }

    pub fn is_root(&self) -> bool {
        self.header().is_root != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.header_mut().is_root = is_root as u8;
    }

    pub fn parent(&self) -> u32 {
        self.header().parent.get()
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.header_mut().parent = U32::new(page_num);
    }

    pub fn num_keys(&self) -> u32 {
        self.header().num_keys.get()
    }

    pub fn set_num_keys(&mut self, num_keys: u32) {
        self.header_mut().num_keys = U32::new(num_keys);
    }

    pub fn right_child(&self) -> u32 {
        self.header().right_child.get()
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        self.header_mut().right_child = U32::new(page_num);
    }

    pub fn key_at(&self, key_num: u32) -> Result<u32> {
        ensure!(
            key_num < self.num_keys(),
            "internal key {} out of bounds (num_keys={})",
            key_num,
            self.num_keys()
        );
        let offset = cell_offset(key_num) + 4;
        Ok(u32::from_le_bytes(
            self.data[offset..offset + 4].try_into().unwrap(),
        ))
    }

    pub fn set_key_at(&mut self, key_num: u32, key: u32) -> Result<()> {
        ensure!(
            (key_num as usize) < INTERNAL_MAX_KEYS,
            "internal cell {} exceeds capacity {}",
            key_num,
            INTERNAL_MAX_KEYS
        );
        let offset = cell_offset(key_num) + 4;
        self.data[offset..offset + 4].copy_from_slice(&key.to_le_bytes());
        Ok(())
    }

    pub fn child_in_cell_at(&self, cell_num: u32) -> Result<u32> {
        ensure!(
            cell_num < self.num_keys(),
            "internal cell {} out of bounds (num_keys={})",
            cell_num,
            self.num_keys()
        );
        let offset = cell_offset(cell_num);
        Ok(u32::from_le_bytes(
            self.data[offset..offset + 4].try_into().unwrap(),
        ))
    }

    pub fn set_child_at(&mut self, cell_num: u32, page_num: u32) -> Result<()> {
        ensure!(
            (cell_num as usize) < INTERNAL_MAX_KEYS,
            "internal cell {} exceeds capacity {}",
            cell_num,
            INTERNAL_MAX_KEYS
        );
        let offset = cell_offset(cell_num);
        self.data[offset..offset + 4].copy_from_slice(&page_num.to_le_bytes());
        Ok(())
    }

    /// Writes a whole (child, key) cell.
    pub fn set_cell(&mut self, cell_num: u32, child: u32, key: u32) -> Result<()> {
        self.set_child_at(cell_num, child)?;
        self.set_key_at(cell_num, key)
    }

    /// Copies the cell at `src` over the cell at `dst` (shift primitive).
    pub fn copy_cell(&mut self, dst: u32, src: u32) -> Result<()> {
        ensure!(
            (dst as usize) < INTERNAL_MAX_KEYS && (src as usize) < INTERNAL_MAX_KEYS,
            "internal cell copy {} <- {} exceeds capacity {}",
            dst,
            src,
            INTERNAL_MAX_KEYS
        );
        self.data.copy_within(
            cell_offset(src)..cell_offset(src) + INTERNAL_CELL_SIZE,
            cell_offset(dst),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PAGE_SIZE;

    fn internal_page() -> Box<PageBuf> {
        let mut page = Box::new([0u8; PAGE_SIZE]);
        InternalNodeMut::init(&mut page).unwrap();
        page
    }

    #[test]
    fn internal_layout_constants() {
        assert_eq!(INTERNAL_HEADER_SIZE, 14);
        assert_eq!(INTERNAL_CELL_SIZE, 8);
        assert_eq!(INTERNAL_MAX_KEYS, 3);
    }

    #[test]
    fn internal_init_marks_node_empty() {
        let page = internal_page();
        let node = InternalNode::from_page(&page).unwrap();

        assert_eq!(node.num_keys(), 0);
        assert_eq!(node.right_child(), INVALID_PAGE);
    }

    #[test]
    fn internal_child_at_resolves_cells_and_right_child() {
        let mut page = internal_page();
        {
            let mut node = InternalNodeMut::from_page(&mut page).unwrap();
            node.set_num_keys(2);
            node.set_cell(0, 4, 10).unwrap();
            node.set_cell(1, 5, 20).unwrap();
            node.set_right_child(6);
        }

        let node = InternalNode::from_page(&page).unwrap();
        assert_eq!(node.child_at(0).unwrap(), 4);
        assert_eq!(node.child_at(1).unwrap(), 5);
        assert_eq!(node.child_at(2).unwrap(), 6);
        assert!(node.child_at(3).is_err());
    }

    #[test]
    fn internal_child_at_rejects_invalid_right_child() {
        let page = internal_page();
        let node = InternalNode::from_page(&page).unwrap();

        let result = node.child_at(0);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid page"));
    }

    #[test]
    fn internal_find_child_picks_the_covering_subtree() {
        let mut page = internal_page();
        {
            let mut node = InternalNodeMut::from_page(&mut page).unwrap();
            node.set_num_keys(2);
            node.set_cell(0, 4, 10).unwrap();
            node.set_cell(1, 5, 20).unwrap();
            node.set_right_child(6);
        }

        let node = InternalNode::from_page(&page).unwrap();
        assert_eq!(node.find_child(1).unwrap(), 0);
        assert_eq!(node.find_child(10).unwrap(), 0);
        assert_eq!(node.find_child(11).unwrap(), 1);
        assert_eq!(node.find_child(20).unwrap(), 1);
        assert_eq!(node.find_child(21).unwrap(), 2);
    }

    #[test]
    fn internal_copy_cell_moves_child_and_key() {
        let mut page = internal_page();
        {
            let mut node = InternalNodeMut::from_page(&mut page).unwrap();
            node.set_num_keys(2);
            node.set_cell(0, 4, 10).unwrap();
            node.set_cell(1, 5, 20).unwrap();
            node.copy_cell(2, 0).unwrap();
            node.set_num_keys(3);
        }

        let node = InternalNode::from_page(&page).unwrap();
        assert_eq!(node.key_at(2).unwrap(), 10);
        assert_eq!(node.child_at(2).unwrap(), 4);
    }
}
