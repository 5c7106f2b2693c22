//! # rowdb - Single-File Persistent Key-Value Store
//!
//! rowdb is a small embedded storage engine: a B+tree over 32-bit unsigned
//! keys with fixed-width row values, persisted in a single file. It provides
//! insertion, point lookup, ordered scans, and deletion with full
//! borrow-or-merge rebalancing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Public API (Database)          │
//! ├─────────────────────────────────────┤
//! │   B+Tree (search/insert/delete)      │
//! ├─────────────────────────────────────┤
//! │      Row Serialization Layer         │
//! ├─────────────────────────────────────┤
//! │  Pager (LRU page cache + pinning)    │
//! ├─────────────────────────────────────┤
//! │     Free-Page Stack │ File Header    │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! The database lives in one file: a free-page header followed by an array
//! of fixed 4KB pages, each of which is one B+tree node.
//!
//! ```text
//! Offset  Size      Content
//! ------  --------  --------------------------------------
//! 0       4         free_pages_count (u32)
//! 4       1600      free_pages_stack ([u32; 400])
//! 1604    4096 * n  page array; page i at 1604 + i * 4096
//! ```
//!
//! The root node is always page 0. Page numbers are stable identifiers;
//! parent/child links between nodes are page numbers resolved through the
//! pager on every access, never in-memory pointers.
//!
//! ## Memory Model
//!
//! At most ten pages are resident at a time. The pager evicts the least
//! recently used unpinned page, writing it back to disk. Every tree
//! operation opens a [`storage::PinScope`] and pins the pages it touches so
//! eviction cannot invalidate a traversal in progress; the scope is released
//! when the operation returns.
//!
//! ## Durability
//!
//! There is no journal and no write-ahead log. A clean shutdown
//! ([`Database::close`]) flushes the free-page header and every resident
//! page; an unclean exit may leave the on-disk tree inconsistent.
//!
//! ## Module Overview
//!
//! - [`storage`]: pager, LRU page cache, pin scopes, free-page stack
//! - [`btree`]: node layouts and the B+tree algorithms
//! - [`row`]: fixed-width row codec
//! - [`database`]: the public engine facade
//! - [`cli`]: interactive statement loop consuming the facade

pub mod btree;
pub mod cli;
pub mod database;
pub mod row;
pub mod storage;

pub use database::{Database, DeleteOutcome, InsertOutcome};
pub use row::Row;
