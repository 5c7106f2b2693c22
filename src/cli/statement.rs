//! # Statement Parser
//!
//! Turns one input line into a [`Statement`] or a [`PrepareError`] carrying
//! the exact user-facing message. Tokens are whitespace-separated; ids must
//! be non-negative integers that fit a u32; string columns are
//! length-checked against the row layout.

use crate::row::{Row, EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
    Delete(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareError {
    NegativeId,
    StringTooLong,
    SyntaxError,
    Unrecognized,
}

impl PrepareError {
    /// The message shown to the user; the loop continues afterwards.
    pub fn message(&self, input: &str) -> String {
        match self {
            PrepareError::NegativeId => "ID must be positive.".to_string(),
            PrepareError::StringTooLong => "String is too long.".to_string(),
            PrepareError::SyntaxError => "Syntax error. Could not parse statement.".to_string(),
            PrepareError::Unrecognized => {
                format!("Unrecognized keyword at start of '{}'.", input)
            }
        }
    }
}

/// Parses one non-meta input line.
pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
    let trimmed = input.trim();
    if trimmed == "select" {
        return Ok(Statement::Select);
    }

    let mut tokens = trimmed.split_whitespace();
    match tokens.next() {
        Some("insert") => prepare_insert(&mut tokens),
        Some("delete") => prepare_delete(&mut tokens),
        _ => Err(PrepareError::Unrecognized),
    }
}

fn prepare_insert<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<Statement, PrepareError> {
    let id = parse_id(tokens.next())?;
    let username = tokens.next().ok_or(PrepareError::SyntaxError)?;
    let email = tokens.next().ok_or(PrepareError::SyntaxError)?;

    if username.len() > USERNAME_MAX_LENGTH || email.len() > EMAIL_MAX_LENGTH {
        return Err(PrepareError::StringTooLong);
    }

    let row = Row::new(id, username, email).map_err(|_| PrepareError::StringTooLong)?;
    Ok(Statement::Insert(row))
}

fn prepare_delete<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<Statement, PrepareError> {
    let id = parse_id(tokens.next())?;
    Ok(Statement::Delete(id))
}

fn parse_id(token: Option<&str>) -> Result<u32, PrepareError> {
    let token = token.ok_or(PrepareError::SyntaxError)?;
    let value: i64 = token.parse().map_err(|_| PrepareError::SyntaxError)?;
    if value < 0 {
        return Err(PrepareError::NegativeId);
    }
    u32::try_from(value).map_err(|_| PrepareError::SyntaxError)
}
