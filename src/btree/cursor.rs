//! # Cursor
//!
//! A cursor is a logical position in the table: a leaf page number and a
//! cell index within it. It carries no borrow of the pager; every read or
//! mutation through a cursor re-resolves the page, so a cursor stays valid
//! across cache evictions (though not across tree mutations, which may move
//! cells between pages).

/// A position in the table, addressing one leaf cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    /// Set when the cursor has advanced past the last row.
    pub end_of_table: bool,
}

impl Cursor {
    pub fn new(page_num: u32, cell_num: u32) -> Self {
        Self {
            page_num,
            cell_num,
            end_of_table: false,
        }
    }
}
