//! # File Header Codec
//!
//! The first 1604 bytes of a database file hold the free-page stack: a u32
//! count followed by a fixed array with one slot per possible page. Only the
//! first `count` slots are meaningful; the rest are whatever was last
//! written there.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----------------
//! 0       4     free_pages_count
//! 4       1600  free_pages_stack
//! ```
//!
//! All fields are little-endian. The header is rewritten in full on clean
//! shutdown; there is no partial update path.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{FreeStack, FILE_HEADER_SIZE, TABLE_MAX_PAGES};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    free_count: U32,
    free_stack: [U32; TABLE_MAX_PAGES],
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == FILE_HEADER_SIZE);

impl FileHeader {
    pub fn new() -> Self {
        Self {
            free_count: U32::new(0),
            free_stack: [U32::new(0); TABLE_MAX_PAGES],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse FileHeader: {:?}", e))
    }

    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            FILE_HEADER_SIZE
        );

        bytes[..FILE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn from_free_stack(stack: &FreeStack) -> Self {
        let mut header = Self::new();
        header.free_count = U32::new(stack.len() as u32);
        for (slot, page_num) in header.free_stack.iter_mut().zip(stack.iter()) {
            *slot = U32::new(page_num);
        }
        header
    }

    pub fn to_free_stack(&self) -> Result<FreeStack> {
        let count = self.free_count.get() as usize;
        ensure!(
            count <= TABLE_MAX_PAGES,
            "corrupt file header: free-page count {} exceeds {}",
            count,
            TABLE_MAX_PAGES
        );

        let mut stack = FreeStack::new();
        for slot in &self.free_stack[..count] {
            stack.push(slot.get());
        }
        Ok(stack)
    }

    pub fn free_count(&self) -> u32 {
        self.free_count.get()
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_size_matches_layout() {
        assert_eq!(std::mem::size_of::<FileHeader>(), 1604);
    }

    #[test]
    fn file_header_round_trips_free_stack() {
        let mut stack = FreeStack::new();
        stack.push(7);
        stack.push(12);
        stack.push(3);

        let header = FileHeader::from_free_stack(&stack);
        assert_eq!(header.free_count(), 3);

        let restored = header.to_free_stack().unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.iter().collect::<Vec<_>>(), vec![7, 12, 3]);
    }

    #[test]
    fn file_header_from_bytes_zero_copy() {
        let mut data = [0u8; FILE_HEADER_SIZE];
        data[0..4].copy_from_slice(&2u32.to_le_bytes());
        data[4..8].copy_from_slice(&9u32.to_le_bytes());
        data[8..12].copy_from_slice(&4u32.to_le_bytes());

        let header = FileHeader::from_bytes(&data).unwrap();
        let stack = header.to_free_stack().unwrap();

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![9, 4]);
    }

    #[test]
    fn file_header_from_bytes_too_small() {
        let data = [0u8; 16];
        assert!(FileHeader::from_bytes(&data).is_err());
    }

    #[test]
    fn file_header_rejects_oversize_count() {
        let mut data = [0u8; FILE_HEADER_SIZE];
        data[0..4].copy_from_slice(&500u32.to_le_bytes());

        let header = FileHeader::from_bytes(&data).unwrap();
        assert!(header.to_free_stack().is_err());
    }
}
