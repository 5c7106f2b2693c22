//! # Command-Line Interface
//!
//! The interactive statement loop over a [`crate::Database`]. The CLI
//! contributes no storage logic; it parses lines into statements, calls the
//! engine facade, and renders outcomes as fixed user-facing strings.
//!
//! ## Input Handling
//!
//! Lines starting with `.` are meta commands (`.exit`, `.btree`,
//! `.constants`); everything else is parsed as a statement
//! (`insert`, `select`, `delete`). Parse and execution errors print a
//! message and the loop continues; only engine-level I/O or integrity
//! failures abort the process.

mod repl;
mod statement;

pub use repl::Repl;
pub use statement::{prepare, PrepareError, Statement};
