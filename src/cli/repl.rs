//! # Interactive Loop
//!
//! Prints the `db > ` prompt, reads lines from standard input, and
//! dispatches them: meta commands immediately, statements through the
//! parser and the engine facade.
//!
//! `.exit` and end-of-input both close the database cleanly; clean close is
//! what makes the file durable, so the loop never skips it on a normal
//! path. Engine errors (I/O failures, integrity violations) propagate out
//! and abort the process with a diagnostic.

use std::io::{self, BufRead, Write};

use eyre::{Result, WrapErr};

use crate::btree::leaf::{LEAF_CELL_SIZE, LEAF_HEADER_SIZE, LEAF_MAX_CELLS, LEAF_SPACE_FOR_CELLS};
use crate::btree::node::COMMON_NODE_HEADER_SIZE;
use crate::database::{Database, DeleteOutcome, InsertOutcome};
use crate::row::ROW_SIZE;

use super::statement::{prepare, Statement};

const PROMPT: &str = "db > ";

enum LineOutcome {
    Continue,
    Exit,
}

pub struct Repl {
    db: Database,
}

impl Repl {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Runs the loop until `.exit` or end of input, then closes the
    /// database.
    pub fn run(mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            print!("{}", PROMPT);
            io::stdout().flush().wrap_err("failed to flush prompt")?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line.wrap_err("failed to read input")?;

            match self.handle_line(line.trim())? {
                LineOutcome::Continue => {}
                LineOutcome::Exit => break,
            }
        }

        self.db.close()
    }

    fn handle_line(&mut self, input: &str) -> Result<LineOutcome> {
        if input.starts_with('.') {
            return self.handle_meta(input);
        }

        match prepare(input) {
            Ok(statement) => self.execute(statement)?,
            Err(err) => println!("{}", err.message(input)),
        }
        Ok(LineOutcome::Continue)
    }

    fn handle_meta(&mut self, input: &str) -> Result<LineOutcome> {
        match input {
            ".exit" => Ok(LineOutcome::Exit),
            ".btree" => {
                println!("Tree:");
                print!("{}", self.db.render_tree()?);
                Ok(LineOutcome::Continue)
            }
            ".constants" => {
                println!("Constants:");
                print_constants();
                Ok(LineOutcome::Continue)
            }
            _ => {
                println!("Unrecognized command: '{}'", input);
                Ok(LineOutcome::Continue)
            }
        }
    }

    fn execute(&mut self, statement: Statement) -> Result<()> {
        match statement {
            Statement::Insert(row) => match self.db.insert(&row)? {
                InsertOutcome::Inserted => println!("Executed."),
                InsertOutcome::DuplicateKey => println!("Error: Duplicate key."),
            },
            Statement::Select => {
                self.db.select_all(|row| println!("{}", row))?;
                println!("Executed.");
            }
            Statement::Delete(id) => match self.db.delete(id)? {
                DeleteOutcome::Deleted => println!("Executed."),
                DeleteOutcome::KeyNotFound => println!("Error: Key not found."),
            },
        }
        Ok(())
    }
}

fn print_constants() {
    println!("ROW_SIZE: {}", ROW_SIZE);
    println!("COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE);
    println!("LEAF_NODE_HEADER_SIZE: {}", LEAF_HEADER_SIZE);
    println!("LEAF_NODE_CELL_SIZE: {}", LEAF_CELL_SIZE);
    println!("LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_SPACE_FOR_CELLS);
    println!("LEAF_NODE_MAX_CELLS: {}", LEAF_MAX_CELLS);
}
