//! # Pager and Page Cache
//!
//! The pager maps page numbers to in-memory page buffers, reading and
//! writing them through the database file. The resident set is bounded:
//! at most [`MAX_LOADED_PAGES`] buffers exist at a time, and loading a page
//! beyond that evicts the least recently used unpinned page, writing its
//! buffer back to disk first.
//!
//! ## Cache Structure
//!
//! ```text
//! Pager
//! ├── slots:    [Option<Box<[u8; 4096]>>; 10]   fixed buffer slots
//! ├── slot_map: page number -> slot index        resident lookup
//! ├── pinned:   [bool; TABLE_MAX_PAGES]          eviction protection
//! └── lru:      VecDeque<page number>            front = most recent
//! ```
//!
//! ## Pin/Unpin Protocol
//!
//! Every [`Pager::page`] call pins the requested page and records the pin in
//! the caller's [`PinScope`]:
//!
//! 1. `page(n, scope)` sets `pinned[n]`, logs `n` in the scope, and moves
//!    `n` to the LRU front.
//! 2. The caller reads or writes the returned buffer.
//! 3. `release(scope)` clears the pin flags when the operation finishes.
//!
//! Eviction walks the LRU list from the back and skips pinned pages. If
//! every resident page is pinned when a slot is needed, the operation fails:
//! that is a bug in the caller (an operation pinned more pages at once than
//! the cache has slots), not a recoverable condition.
//!
//! ## Allocation
//!
//! Pages are never allocated explicitly. Requesting a page number at or past
//! `num_pages` extends the logical page count; the file itself grows when
//! the page is first written back. [`Pager::unused_page_num`] hands out
//! recycled numbers from the free stack before fresh ones.
//!
//! ## Write-Back
//!
//! A buffer reaches disk on eviction and on [`Pager::close`]. There is no
//! dirty tracking and no fsync protocol; a clean close is what makes the
//! file consistent.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use zerocopy::IntoBytes;

use super::{
    page_offset, FileHeader, FreeStack, PinScope, FILE_HEADER_SIZE, MAX_LOADED_PAGES, PAGE_SIZE,
    TABLE_MAX_PAGES,
};

/// One in-memory page image.
pub type PageBuf = [u8; PAGE_SIZE];

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    slots: [Option<Box<PageBuf>>; MAX_LOADED_PAGES],
    slot_map: [Option<usize>; TABLE_MAX_PAGES],
    pinned: [bool; TABLE_MAX_PAGES],
    lru: VecDeque<u32>,
    free_stack: FreeStack,
}

impl Pager {
    /// Opens (or creates) a database file and reads its free-page header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open database file '{}'", path.display()))?;

        let file_length = file
            .metadata()
            .wrap_err("failed to stat database file")?
            .len();

        let (free_stack, num_pages) = if file_length == 0 {
            (FreeStack::new(), 0)
        } else {
            ensure!(
                file_length >= FILE_HEADER_SIZE as u64,
                "corrupt database file: {} bytes is shorter than the {} byte header",
                file_length,
                FILE_HEADER_SIZE
            );

            let mut header_bytes = [0u8; FILE_HEADER_SIZE];
            file.seek(SeekFrom::Start(0))
                .wrap_err("failed to seek to file header")?;
            file.read_exact(&mut header_bytes)
                .wrap_err("failed to read file header")?;

            let header = FileHeader::from_bytes(&header_bytes)?;
            let num_pages = ((file_length - FILE_HEADER_SIZE as u64) / PAGE_SIZE as u64) as u32;
            (header.to_free_stack()?, num_pages)
        };

        Ok(Self {
            file,
            file_length,
            num_pages,
            slots: std::array::from_fn(|_| None),
            slot_map: [None; TABLE_MAX_PAGES],
            pinned: [false; TABLE_MAX_PAGES],
            lru: VecDeque::new(),
            free_stack,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn resident_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_resident(&self, page_num: u32) -> bool {
        (page_num as usize) < TABLE_MAX_PAGES && self.slot_map[page_num as usize].is_some()
    }

    pub fn is_pinned(&self, page_num: u32) -> bool {
        (page_num as usize) < TABLE_MAX_PAGES && self.pinned[page_num as usize]
    }

    pub fn free_stack(&self) -> &FreeStack {
        &self.free_stack
    }

    /// Returns the buffer for `page_num`, pinning it for the duration of
    /// `scope` and loading it from disk if it is not resident.
    ///
    /// Requesting a page number at or past `num_pages` extends the logical
    /// page count: this is how fresh pages are allocated.
    pub fn page(&mut self, page_num: u32, scope: &mut PinScope) -> Result<&mut PageBuf> {
        ensure!(
            (page_num as usize) < TABLE_MAX_PAGES,
            "page number {} out of bounds (max {})",
            page_num,
            TABLE_MAX_PAGES
        );

        self.pinned[page_num as usize] = true;
        scope.record(page_num);
        self.lru_touch(page_num);

        let slot = match self.slot_map[page_num as usize] {
            Some(slot) => slot,
            None => self.load_page(page_num)?,
        };

        self.slots[slot]
            .as_deref_mut()
            .ok_or_else(|| eyre::eyre!("cache slot for page {} is empty", page_num))
    }

    /// Unpins every page the scope recorded, in insertion order.
    pub fn release(&mut self, scope: PinScope) {
        for &page_num in scope.pages() {
            self.pinned[page_num as usize] = false;
        }
    }

    /// Yields a page number for a new node: a recycled number off the free
    /// stack when one exists, otherwise a fresh number appended to the file.
    pub fn unused_page_num(&mut self) -> u32 {
        self.free_stack.pop().unwrap_or(self.num_pages)
    }

    /// Marks a page as reclaimable. Its on-disk bytes are left as-is; the
    /// next user must reinitialize the page.
    pub fn free_page(&mut self, page_num: u32) {
        self.free_stack.push(page_num);
    }

    /// Pops the most recently freed page number off the free stack.
    pub fn pop_free_page(&mut self) -> Option<u32> {
        self.free_stack.pop()
    }

    /// Writes the free-page header and every resident page, consuming the
    /// pager. Required for a consistent on-disk state.
    pub fn close(mut self) -> Result<()> {
        self.write_header()?;
        for page_num in 0..self.num_pages {
            if self.slot_map[page_num as usize].is_some() {
                self.flush_page(page_num)?;
            }
        }
        Ok(())
    }

    fn load_page(&mut self, page_num: u32) -> Result<usize> {
        let mut buf: Box<PageBuf> = Box::new([0u8; PAGE_SIZE]);

        let offset = page_offset(page_num);
        if offset < self.file_length {
            let available = (self.file_length - offset).min(PAGE_SIZE as u64) as usize;
            self.file
                .seek(SeekFrom::Start(offset))
                .wrap_err_with(|| format!("failed to seek to page {}", page_num))?;
            self.file
                .read_exact(&mut buf[..available])
                .wrap_err_with(|| format!("failed to read page {}", page_num))?;
        }

        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        let slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => self.evict()?,
        };

        self.slot_map[page_num as usize] = Some(slot);
        self.slots[slot] = Some(buf);
        Ok(slot)
    }

    /// Evicts the least recently used unpinned page, returning its slot.
    fn evict(&mut self) -> Result<usize> {
        let victim = self
            .lru
            .iter()
            .rev()
            .copied()
            .find(|&pn| !self.pinned[pn as usize] && self.slot_map[pn as usize].is_some())
            .ok_or_else(|| {
                eyre::eyre!(
                    "cannot evict: every cached page is pinned (capacity {})",
                    MAX_LOADED_PAGES
                )
            })?;

        self.flush_page(victim)?;

        let slot = self.slot_map[victim as usize]
            .take()
            .ok_or_else(|| eyre::eyre!("eviction victim {} has no cache slot", victim))?;
        self.slots[slot] = None;
        self.lru.retain(|&pn| pn != victim);
        Ok(slot)
    }

    fn flush_page(&mut self, page_num: u32) -> Result<()> {
        let slot = self.slot_map[page_num as usize]
            .ok_or_else(|| eyre::eyre!("tried to flush page {} that is not resident", page_num))?;
        let buf = self.slots[slot]
            .as_deref()
            .ok_or_else(|| eyre::eyre!("cache slot for page {} is empty", page_num))?;

        let offset = page_offset(page_num);
        self.file
            .seek(SeekFrom::Start(offset))
            .wrap_err_with(|| format!("failed to seek to page {}", page_num))?;
        self.file
            .write_all(buf)
            .wrap_err_with(|| format!("failed to write page {}", page_num))?;
        self.file_length = self.file_length.max(offset + PAGE_SIZE as u64);
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        let header = FileHeader::from_free_stack(&self.free_stack);
        self.file
            .seek(SeekFrom::Start(0))
            .wrap_err("failed to seek to file header")?;
        self.file
            .write_all(header.as_bytes())
            .wrap_err("failed to write file header")?;
        self.file_length = self.file_length.max(FILE_HEADER_SIZE as u64);
        Ok(())
    }

    /// Moves a page to the most-recently-used position.
    fn lru_touch(&mut self, page_num: u32) {
        if let Some(pos) = self.lru.iter().position(|&pn| pn == page_num) {
            self.lru.remove(pos);
        }
        self.lru.push_front(page_num);
    }
}
