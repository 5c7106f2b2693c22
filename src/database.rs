//! # Database Facade
//!
//! The public engine surface: open and close a database file, insert, point
//! lookup through deletion, and ordered scans. External callers (the CLI,
//! tests) see only this type; the pager and tree are implementation detail.
//!
//! Every operation opens one pin scope and releases it before returning,
//! error path included. Scans release their pins per step instead: each row
//! read pins at most the current leaf and its successor, so a scan over an
//! arbitrarily large table never outgrows the page cache.

use std::path::Path;

use eyre::Result;

use crate::btree::BTree;
use crate::row::Row;
use crate::storage::{Pager, PinScope};

pub use crate::btree::{DeleteOutcome, InsertOutcome};

/// An open database: a file, its pager, and the B+tree rooted at page 0.
pub struct Database {
    pager: Pager,
}

impl Database {
    /// Opens (or creates) the database at `path`. A fresh file gets page 0
    /// initialized as an empty root leaf.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            let mut scope = PinScope::new();
            let result = BTree::new(&mut pager).bootstrap(&mut scope);
            pager.release(scope);
            result?;
        }

        Ok(Self { pager })
    }

    /// Flushes the free-page header and every resident page, then closes
    /// the file. Required for a consistent on-disk state.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }

    /// Inserts a row keyed by its id. An existing id is reported, not
    /// overwritten.
    pub fn insert(&mut self, row: &Row) -> Result<InsertOutcome> {
        let mut scope = PinScope::new();
        let result = BTree::new(&mut self.pager).insert(row, &mut scope);
        self.pager.release(scope);
        result
    }

    /// Deletes the row with the given id.
    pub fn delete(&mut self, id: u32) -> Result<DeleteOutcome> {
        let mut scope = PinScope::new();
        let result = BTree::new(&mut self.pager).delete(id, &mut scope);
        self.pager.release(scope);
        result
    }

    /// Looks up a single row by id.
    pub fn find(&mut self, id: u32) -> Result<Option<Row>> {
        let mut scope = PinScope::new();
        let result = BTree::new(&mut self.pager).find_row(id, &mut scope);
        self.pager.release(scope);
        result
    }

    /// Visits every row in ascending key order.
    pub fn select_all(&mut self, mut emit: impl FnMut(&Row)) -> Result<()> {
        let mut scope = PinScope::new();
        let cursor = BTree::new(&mut self.pager).start(&mut scope);
        self.pager.release(scope);
        let mut cursor = cursor?;

        while !cursor.end_of_table {
            let mut scope = PinScope::new();
            let mut tree = BTree::new(&mut self.pager);
            let step = (|| {
                let row = tree.read_row(&cursor, &mut scope)?;
                emit(&row);
                tree.advance(&mut cursor, &mut scope)
            })();
            self.pager.release(scope);
            step?;
        }
        Ok(())
    }

    /// Renders the tree structure for the debug command.
    pub fn render_tree(&mut self) -> Result<String> {
        BTree::new(&mut self.pager).render()
    }
}
