//! # CLI Conformance Tests
//!
//! Drives the compiled binary through a pipe and asserts on the exact
//! transcript: prompts, statement results, and error messages are part of
//! the user-facing contract.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::tempdir;

fn run_script<P: AsRef<Path>>(db_path: P, commands: &[&str]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_rowdb"))
        .arg(db_path.as_ref())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn rowdb");

    {
        let mut stdin = child.stdin.take().expect("failed to open stdin");
        for command in commands {
            writeln!(stdin, "{}", command).expect("failed to write command");
        }
    }

    child.wait_with_output().expect("failed to collect output")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is not utf-8")
}

#[test]
fn inserts_and_retrieves_a_row() {
    let dir = tempdir().unwrap();
    let output = run_script(
        dir.path().join("test.db"),
        &["insert 1 user1 person1@example.com", "select", ".exit"],
    );

    assert!(output.status.success());
    assert_eq!(
        stdout_of(&output),
        "db > Executed.\n\
         db > (1, user1, person1@example.com)\n\
         Executed.\n\
         db > "
    );
}

#[test]
fn out_of_order_inserts_select_in_key_order() {
    let dir = tempdir().unwrap();
    let output = run_script(
        dir.path().join("test.db"),
        &[
            "insert 3 user3 person3@example.com",
            "insert 1 user1 person1@example.com",
            "insert 2 user2 person2@example.com",
            "select",
            ".exit",
        ],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\n\
         db > Executed.\n\
         db > Executed.\n\
         db > (1, user1, person1@example.com)\n\
         (2, user2, person2@example.com)\n\
         (3, user3, person3@example.com)\n\
         Executed.\n\
         db > "
    );
}

#[test]
fn duplicate_key_reports_error_and_preserves_the_row() {
    let dir = tempdir().unwrap();
    let output = run_script(
        dir.path().join("test.db"),
        &[
            "insert 1 user1 person1@example.com",
            "insert 1 user2 person2@example.com",
            "select",
            ".exit",
        ],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\n\
         db > Error: Duplicate key.\n\
         db > (1, user1, person1@example.com)\n\
         Executed.\n\
         db > "
    );
}

#[test]
fn delete_of_missing_key_reports_error() {
    let dir = tempdir().unwrap();
    let output = run_script(
        dir.path().join("test.db"),
        &["insert 1 user1 person1@example.com", "delete 2", "delete 1", "select", ".exit"],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\n\
         db > Error: Key not found.\n\
         db > Executed.\n\
         db > Executed.\n\
         db > "
    );
}

#[test]
fn parse_errors_keep_the_loop_running() {
    let dir = tempdir().unwrap();
    let long_username = "u".repeat(33);
    let oversize = format!("insert 1 {} a@b", long_username);
    let output = run_script(
        dir.path().join("test.db"),
        &[
            "insert -1 user1 person1@example.com",
            &oversize,
            "insert 1 user1",
            "update 1",
            ".foo",
            ".exit",
        ],
    );

    assert_eq!(
        stdout_of(&output),
        "db > ID must be positive.\n\
         db > String is too long.\n\
         db > Syntax error. Could not parse statement.\n\
         db > Unrecognized keyword at start of 'update 1'.\n\
         db > Unrecognized command: '.foo'\n\
         db > "
    );
}

#[test]
fn constants_command_prints_the_layout() {
    let dir = tempdir().unwrap();
    let output = run_script(dir.path().join("test.db"), &[".constants", ".exit"]);

    assert_eq!(
        stdout_of(&output),
        "db > Constants:\n\
         ROW_SIZE: 293\n\
         COMMON_NODE_HEADER_SIZE: 6\n\
         LEAF_NODE_HEADER_SIZE: 14\n\
         LEAF_NODE_CELL_SIZE: 297\n\
         LEAF_NODE_SPACE_FOR_CELLS: 4082\n\
         LEAF_NODE_MAX_CELLS: 13\n\
         db > "
    );
}

#[test]
fn btree_command_prints_a_single_leaf() {
    let dir = tempdir().unwrap();
    let output = run_script(
        dir.path().join("test.db"),
        &[
            "insert 3 user3 person3@example.com",
            "insert 1 user1 person1@example.com",
            "insert 2 user2 person2@example.com",
            ".btree",
            ".exit",
        ],
    );

    assert_eq!(
        stdout_of(&output),
        "db > Executed.\n\
         db > Executed.\n\
         db > Executed.\n\
         db > Tree:\n\
         - leaf (size 3)\n  - 1\n  - 2\n  - 3\n\
         db > "
    );
}

#[test]
fn btree_command_prints_a_split_tree() {
    let dir = tempdir().unwrap();
    let inserts: Vec<String> = (1..=14)
        .map(|id| format!("insert {} user{} person{}@example.com", id, id, id))
        .collect();
    let mut commands: Vec<&str> = inserts.iter().map(String::as_str).collect();
    commands.push(".btree");
    commands.push(".exit");

    let output = run_script(dir.path().join("test.db"), &commands);

    let mut expected = String::new();
    for _ in 1..=14 {
        expected.push_str("db > Executed.\n");
    }
    expected.push_str("db > Tree:\n- internal (size 1)\n  - leaf (size 7)\n");
    for id in 1..=7 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("  - key 7\n  - leaf (size 7)\n");
    for id in 8..=14 {
        expected.push_str(&format!("    - {}\n", id));
    }
    expected.push_str("db > ");

    assert_eq!(stdout_of(&output), expected);
}

#[test]
fn rows_survive_across_processes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let inserts: Vec<String> = (1..=30)
        .map(|id| format!("insert {} user{} person{}@example.com", id, id, id))
        .collect();
    let mut commands: Vec<&str> = inserts.iter().map(String::as_str).collect();
    commands.push(".exit");
    let first = run_script(&path, &commands);
    assert!(first.status.success());

    let second = run_script(&path, &["select", ".exit"]);

    let mut expected = String::from("db > ");
    for id in 1..=30 {
        expected.push_str(&format!("({}, user{}, person{}@example.com)\n", id, id, id));
    }
    expected.push_str("Executed.\ndb > ");
    assert_eq!(stdout_of(&second), expected);
}

#[test]
fn deletion_sequence_with_merge_keeps_selects_consistent() {
    let dir = tempdir().unwrap();
    let inserts: Vec<String> = (1..=20)
        .map(|id| format!("insert {} user{} person{}@example.com", id, id, id))
        .collect();
    let mut commands: Vec<&str> = inserts.iter().map(String::as_str).collect();
    commands.extend(["delete 1", "delete 2", "delete 3", "delete 4", "select", ".exit"]);

    let output = run_script(dir.path().join("test.db"), &commands);

    let mut expected = String::new();
    for _ in 1..=20 {
        expected.push_str("db > Executed.\n");
    }
    for _ in 1..=4 {
        expected.push_str("db > Executed.\n");
    }
    expected.push_str("db > ");
    for id in 5..=20 {
        expected.push_str(&format!("({}, user{}, person{}@example.com)\n", id, id, id));
    }
    expected.push_str("Executed.\ndb > ");
    assert_eq!(stdout_of(&output), expected);
}

#[test]
fn missing_database_filename_is_an_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_rowdb"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run rowdb");

    assert!(!output.status.success());
    assert_eq!(stdout_of(&output), "Must supply a database filename.\n");
}

#[test]
fn end_of_input_closes_the_database_cleanly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    // no .exit: the pipe just closes
    let first = run_script(&path, &["insert 5 user5 person5@example.com"]);
    assert!(first.status.success());

    let second = run_script(&path, &["select", ".exit"]);
    assert_eq!(
        stdout_of(&second),
        "db > (5, user5, person5@example.com)\n\
         Executed.\n\
         db > "
    );
}
