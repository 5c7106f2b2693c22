//! # Storage Module
//!
//! The foundational storage layer for rowdb: a pager that reads and writes
//! fixed 4KB pages through a bounded in-memory cache, a pin-scope mechanism
//! that protects pages from eviction while an operation uses them, and a
//! free-page stack that recycles pages released by tree rebalancing.
//!
//! ## Layout Constants
//!
//! The constants below define the on-disk geometry. They are interdependent;
//! the compile-time assertions at the bottom keep the derived values honest.
//!
//! ```text
//! PAGE_SIZE (4096)
//!       │
//!       └─> page i lives at FILE_HEADER_SIZE + i * PAGE_SIZE
//!
//! TABLE_MAX_PAGES (400)
//!       │
//!       ├─> FREE_STACK_BYTES (one u32 slot per possible page)
//!       │
//!       └─> FILE_HEADER_SIZE (count + stack = 1604 bytes)
//!
//! MAX_LOADED_PAGES (10)
//!       │
//!       └─> hard ceiling on simultaneously pinned pages: an operation
//!           that pins more than this many pages at once cannot complete,
//!           because eviction refuses to touch pinned pages
//! ```
//!
//! ## Module Organization
//!
//! - `pager`: page cache with LRU eviction, write-back, and pinning
//! - `pin`: per-operation pin scopes
//! - `freelist`: bounded LIFO of reclaimable page numbers
//! - `file_header`: codec for the header persisted at file offset 0

mod file_header;
mod freelist;
mod pager;
mod pin;

pub use file_header::FileHeader;
pub use freelist::FreeStack;
pub use pager::{PageBuf, Pager};
pub use pin::PinScope;

/// Size of each database page in bytes. This is the unit of I/O and caching.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages a database file may hold.
pub const TABLE_MAX_PAGES: usize = 400;

/// Maximum number of pages resident in memory at any time.
pub const MAX_LOADED_PAGES: usize = 10;

/// Sentinel page number meaning "no page".
pub const INVALID_PAGE: u32 = u32::MAX;

/// Size of the persisted free-page stack array.
pub const FREE_STACK_BYTES: usize = TABLE_MAX_PAGES * 4;

/// Size of the file header preceding the page array: the free-page count
/// followed by the free-page stack.
pub const FILE_HEADER_SIZE: usize = 4 + FREE_STACK_BYTES;

/// Byte offset of a page within the database file.
pub fn page_offset(page_num: u32) -> u64 {
    FILE_HEADER_SIZE as u64 + page_num as u64 * PAGE_SIZE as u64
}

const _: () = assert!(
    FILE_HEADER_SIZE == 1604,
    "free-page header layout changed; on-disk format is fixed"
);

const _: () = assert!(
    MAX_LOADED_PAGES <= TABLE_MAX_PAGES,
    "cache cannot hold more pages than the file may contain"
);
