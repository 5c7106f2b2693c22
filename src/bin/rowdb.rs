//! # rowdb CLI Entry Point
//!
//! ```bash
//! rowdb ./mydb.db
//! ```
//!
//! Opens (or creates) the database file named on the command line and
//! hands control to the interactive loop. A missing filename or an engine
//! failure exits nonzero.

use std::env;
use std::process;

use eyre::{Result, WrapErr};
use rowdb::cli::Repl;
use rowdb::Database;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        println!("Must supply a database filename.");
        process::exit(1);
    };

    let db = Database::open(&path)
        .wrap_err_with(|| format!("failed to open database at '{}'", path))?;

    Repl::new(db).run()
}
