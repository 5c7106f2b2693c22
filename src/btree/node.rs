//! # Common Node Header
//!
//! Every page is one B+tree node and begins with the same 6-byte header:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----------------------------------------
//! 0       1     node_type (0 = internal, 1 = leaf)
//! 1       1     is_root
//! 2       4     parent page number (undefined on the root)
//! ```
//!
//! The kind-specific headers in [`crate::btree::leaf`] and
//! [`crate::btree::interior`] extend this prefix; this module gives the tree
//! algorithms a way to classify a page and follow parent links without
//! committing to a node kind.

use eyre::{bail, ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Size of the header prefix shared by both node kinds.
pub const COMMON_NODE_HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

impl NodeType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => bail!("invalid node type byte: {:#04x}", other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            NodeType::Internal => 0,
            NodeType::Leaf => 1,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == COMMON_NODE_HEADER_SIZE);

impl NodeHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= COMMON_NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            COMMON_NODE_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..COMMON_NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= COMMON_NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            COMMON_NODE_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..COMMON_NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn node_type(&self) -> Result<NodeType> {
        NodeType::from_byte(self.node_type)
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type.as_byte();
    }

    pub fn is_root(&self) -> bool {
        self.is_root != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.is_root = is_root as u8;
    }

    pub fn parent(&self) -> u32 {
        self.parent.get()
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.parent = U32::new(page_num);
    }
}
