//! # Leaf Nodes
//!
//! Leaf nodes hold the actual rows. Cells are fixed-width (key + encoded
//! row) and kept strictly ordered by key, so lookup is a binary search and
//! insertion shifts the tail of the cell array.
//!
//! ## Page Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -------------------------------
//! 0       6     common node header
//! 6       4     num_cells
//! 10      4     next_leaf (0 = rightmost leaf)
//! 14      297   cell 0 (key u32 + 293-byte row)
//! 311     297   cell 1
//! ...
//! ```
//!
//! Thirteen cells fit in a 4KB page. `next_leaf` links the leaves in key
//! order for scans; 0 terminates the chain (the root page is 0, and page 0
//! can never be another leaf's successor).

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::row::ROW_SIZE;
use crate::storage::{PageBuf, PAGE_SIZE};

use super::node::{NodeHeader, NodeType};

/// Size of the leaf header (common header + num_cells + next_leaf).
pub const LEAF_HEADER_SIZE: usize = 14;

/// Size of one leaf cell: a u32 key followed by an encoded row.
pub const LEAF_CELL_SIZE: usize = 4 + ROW_SIZE;

/// Bytes available for cells in one leaf page.
pub const LEAF_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_HEADER_SIZE;

/// Maximum number of cells in one leaf.
pub const LEAF_MAX_CELLS: usize = LEAF_SPACE_FOR_CELLS / LEAF_CELL_SIZE;

/// Cells that land in the new (right) leaf on a split.
pub const LEAF_RIGHT_SPLIT_COUNT: usize = (LEAF_MAX_CELLS + 1) / 2;

/// Cells that stay in the old (left) leaf on a split.
pub const LEAF_LEFT_SPLIT_COUNT: usize = (LEAF_MAX_CELLS + 1) - LEAF_RIGHT_SPLIT_COUNT;

/// A non-root leaf with fewer cells than this is rebalanced.
pub const LEAF_MIN_CELLS: usize = 7;

const _: () = assert!(LEAF_MAX_CELLS == 13);
const _: () = assert!(LEAF_LEFT_SPLIT_COUNT + LEAF_RIGHT_SPLIT_COUNT == LEAF_MAX_CELLS + 1);
const _: () = assert!(LEAF_MIN_CELLS <= LEAF_LEFT_SPLIT_COUNT);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct LeafHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
    num_cells: U32,
    next_leaf: U32,
}

const _: () = assert!(std::mem::size_of::<LeafHeader>() == LEAF_HEADER_SIZE);

fn cell_offset(cell_num: u32) -> usize {
    LEAF_HEADER_SIZE + cell_num as usize * LEAF_CELL_SIZE
}

/// Read-only view of a leaf page.
#[derive(Debug)]
pub struct LeafNode<'a> {
    data: &'a PageBuf,
}

/// Mutable view of a leaf page.
pub struct LeafNodeMut<'a> {
    data: &'a mut PageBuf,
}

impl<'a> LeafNode<'a> {
    pub fn from_page(data: &'a PageBuf) -> Result<Self> {
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.node_type()? == NodeType::Leaf,
            "expected leaf node, got internal"
        );
        Ok(Self { data })
    }

    fn header(&self) -> &LeafHeader {
        LeafHeader::ref_from_bytes(&self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    pub fn is_root(&self) -> bool {
        self.header().is_root != 0
    }

    pub fn parent(&self) -> u32 {
        self.header().parent.get()
    }

    pub fn num_cells(&self) -> u32 {
        self.header().num_cells.get()
    }

    pub fn next_leaf(&self) -> u32 {
        self.header().next_leaf.get()
    }

    pub fn key_at(&self, cell_num: u32) -> Result<u32> {
        ensure!(
            cell_num < self.num_cells(),
            "leaf cell {} out of bounds (num_cells={})",
            cell_num,
            self.num_cells()
        );
        let offset = cell_offset(cell_num);
        Ok(u32::from_le_bytes(
            self.data[offset..offset + 4].try_into().unwrap(),
        ))
    }

    pub fn row_bytes_at(&self, cell_num: u32) -> Result<&'a [u8]> {
        ensure!(
            cell_num < self.num_cells(),
            "leaf cell {} out of bounds (num_cells={})",
            cell_num,
            self.num_cells()
        );
        let offset = cell_offset(cell_num) + 4;
        Ok(&self.data[offset..offset + ROW_SIZE])
    }

    pub fn cell_bytes_at(&self, cell_num: u32) -> Result<&'a [u8]> {
        ensure!(
            cell_num < self.num_cells(),
            "leaf cell {} out of bounds (num_cells={})",
            cell_num,
            self.num_cells()
        );
        let offset = cell_offset(cell_num);
        Ok(&self.data[offset..offset + LEAF_CELL_SIZE])
    }

    /// Binary search for `key`: the returned index is where the key sits if
    /// present, else where it would be inserted.
    pub fn find(&self, key: u32) -> Result<u32> {
        let mut min_index = 0;
        let mut one_past_max_index = self.num_cells();

        while min_index != one_past_max_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = self.key_at(index)?;
            if key == key_at_index {
                return Ok(index);
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(min_index)
    }

    /// Key of the last cell.
    pub fn max_key(&self) -> Result<u32> {
        ensure!(self.num_cells() > 0, "max key of an empty leaf");
        self.key_at(self.num_cells() - 1)
    }
}

impl<'a> LeafNodeMut<'a> {
    pub fn from_page(data: &'a mut PageBuf) -> Result<Self> {
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.node_type()? == NodeType::Leaf,
            "expected leaf node, got internal"
        );
        Ok(Self { data })
    }

    /// Zeroes the page and writes a fresh non-root leaf header.
    pub fn init(data: &'a mut PageBuf) -> Result<Self> {
        data.fill(0);
        let header = NodeHeader::from_bytes_mut(data)?;
        header.set_node_type(NodeType::Leaf);
        header.set_root(false);
        Ok(Self { data })
    }

    fn header_mut(&mut self) -> &mut LeafHeader {
        LeafHeader::mut_from_bytes(&mut self.data[..LEAF_HEADER_SIZE]).unwrap()
    }

    fn header(&self) -> &LeafHeader {
        LeafHeader::ref_from_bytes(&self.data[..LEAF_HEADER_SIZE]).unwrap()
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

    pub fn num_cells(&self) -> u32 {
        self.header().num_cells.get()
    }

    pub fn set_num_cells(&mut self, num_cells: u32) {
        self.header_mut().num_cells = U32::new(num_cells);
    }

    pub fn next_leaf(&self) -> u32 {
        self.header().next_leaf.get()
    }

    pub fn set_next_leaf(&mut self, page_num: u32) {
        self.header_mut().next_leaf = U32::new(page_num);
    }

    pub fn key_at(&self, cell_num: u32) -> Result<u32> {
        ensure!(
            cell_num < self.num_cells(),
            "leaf cell {} out of bounds (num_cells={})",
            cell_num,
            self.num_cells()
        );
        let offset = cell_offset(cell_num);
        Ok(u32::from_le_bytes(
            self.data[offset..offset + 4].try_into().unwrap(),
        ))
    }

    pub fn set_key_at(&mut self, cell_num: u32, key: u32) -> Result<()> {
        ensure!(
            (cell_num as usize) < LEAF_MAX_CELLS,
            "leaf cell {} exceeds capacity {}",
            cell_num,
            LEAF_MAX_CELLS
        );
        let offset = cell_offset(cell_num);
        self.data[offset..offset + 4].copy_from_slice(&key.to_le_bytes());
        Ok(())
    }

    pub fn row_bytes_mut(&mut self, cell_num: u32) -> Result<&mut [u8]> {
        ensure!(
            (cell_num as usize) < LEAF_MAX_CELLS,
            "leaf cell {} exceeds capacity {}",
            cell_num,
            LEAF_MAX_CELLS
        );
        let offset = cell_offset(cell_num) + 4;
        Ok(&mut self.data[offset..offset + ROW_SIZE])
    }

    pub fn set_cell_bytes(&mut self, cell_num: u32, cell: &[u8]) -> Result<()> {
        ensure!(
            (cell_num as usize) < LEAF_MAX_CELLS,
            "leaf cell {} exceeds capacity {}",
            cell_num,
            LEAF_MAX_CELLS
        );
        ensure!(
            cell.len() == LEAF_CELL_SIZE,
            "leaf cell must be {} bytes, got {}",
            LEAF_CELL_SIZE,
            cell.len()
        );
        let offset = cell_offset(cell_num);
        self.data[offset..offset + LEAF_CELL_SIZE].copy_from_slice(cell);
        Ok(())
    }

    /// Copies the cell at `src` over the cell at `dst` (shift primitive).
    pub fn copy_cell(&mut self, dst: u32, src: u32) -> Result<()> {
        ensure!(
            (dst as usize) < LEAF_MAX_CELLS && (src as usize) < LEAF_MAX_CELLS,
            "leaf cell copy {} <- {} exceeds capacity {}",
            dst,
            src,
            LEAF_MAX_CELLS
        );
        self.data
            .copy_within(cell_offset(src)..cell_offset(src) + LEAF_CELL_SIZE, cell_offset(dst));
        Ok(())
    }
}
