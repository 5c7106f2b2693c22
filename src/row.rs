//! # Row Serialization
//!
//! Rows are fixed-width: a u32 id followed by two NUL-padded ASCII string
//! columns. Each string field reserves one byte beyond its column size for a
//! terminator, so the encoded row is always exactly [`ROW_SIZE`] bytes.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ---------------------------
//! 0       4     id (u32, little-endian)
//! 4       33    username (32 chars + NUL)
//! 37      256   email (255 chars + NUL)
//! ```

use std::fmt;

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Maximum length of the username column in bytes.
pub const USERNAME_MAX_LENGTH: usize = 32;

/// Maximum length of the email column in bytes.
pub const EMAIL_MAX_LENGTH: usize = 255;

const USERNAME_FIELD_SIZE: usize = USERNAME_MAX_LENGTH + 1;
const EMAIL_FIELD_SIZE: usize = EMAIL_MAX_LENGTH + 1;

/// Encoded size of one row.
pub const ROW_SIZE: usize = 4 + USERNAME_FIELD_SIZE + EMAIL_FIELD_SIZE;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RowBytes {
    id: U32,
    username: [u8; USERNAME_FIELD_SIZE],
    email: [u8; EMAIL_FIELD_SIZE],
}

const _: () = assert!(std::mem::size_of::<RowBytes>() == ROW_SIZE);

/// One record: the row order over a table is defined by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Builds a row, validating the column length limits.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self> {
        ensure!(
            username.len() <= USERNAME_MAX_LENGTH,
            "username exceeds {} bytes",
            USERNAME_MAX_LENGTH
        );
        ensure!(
            email.len() <= EMAIL_MAX_LENGTH,
            "email exceeds {} bytes",
            EMAIL_MAX_LENGTH
        );

        Ok(Self {
            id,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Encodes the row into the first [`ROW_SIZE`] bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        ensure!(
            buf.len() >= ROW_SIZE,
            "buffer too small for Row: {} < {}",
            buf.len(),
            ROW_SIZE
        );
        ensure!(
            self.username.len() <= USERNAME_MAX_LENGTH,
            "username exceeds {} bytes",
            USERNAME_MAX_LENGTH
        );
        ensure!(
            self.email.len() <= EMAIL_MAX_LENGTH,
            "email exceeds {} bytes",
            EMAIL_MAX_LENGTH
        );

        let encoded = RowBytes {
            id: U32::new(self.id),
            username: pad_field(&self.username),
            email: pad_field(&self.email),
        };
        buf[..ROW_SIZE].copy_from_slice(encoded.as_bytes());
        Ok(())
    }

    /// Decodes a row from the first [`ROW_SIZE`] bytes of `buf`.
    pub fn read_from(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= ROW_SIZE,
            "buffer too small for Row: {} < {}",
            buf.len(),
            ROW_SIZE
        );

        let encoded = RowBytes::ref_from_bytes(&buf[..ROW_SIZE])
            .map_err(|e| eyre::eyre!("failed to decode Row: {:?}", e))?;

        Ok(Self {
            id: encoded.id.get(),
            username: field_to_string(&encoded.username),
            email: field_to_string(&encoded.email),
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn pad_field<const N: usize>(value: &str) -> [u8; N] {
    let mut field = [0u8; N];
    field[..value.len()].copy_from_slice(value.as_bytes());
    field
}

fn field_to_string(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_size_matches_layout() {
        assert_eq!(ROW_SIZE, 293);
    }

    #[test]
    fn row_round_trips_through_bytes() {
        let row = Row::new(42, "alice", "alice@example.com").unwrap();
        let mut buf = [0u8; ROW_SIZE];

        row.write_to(&mut buf).unwrap();
        let decoded = Row::read_from(&buf).unwrap();

        assert_eq!(decoded, row);
    }

    #[test]
    fn row_encoding_is_nul_padded() {
        let row = Row::new(1, "ab", "c@d").unwrap();
        let mut buf = [0xFFu8; ROW_SIZE];

        row.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &1u32.to_le_bytes());
        assert_eq!(&buf[4..6], b"ab");
        assert!(buf[6..37].iter().all(|&b| b == 0));
        assert_eq!(&buf[37..40], b"c@d");
        assert!(buf[40..ROW_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn row_accepts_maximum_length_columns() {
        let username = "u".repeat(USERNAME_MAX_LENGTH);
        let email = "e".repeat(EMAIL_MAX_LENGTH);

        let row = Row::new(1, &username, &email).unwrap();
        let mut buf = [0u8; ROW_SIZE];
        row.write_to(&mut buf).unwrap();

        let decoded = Row::read_from(&buf).unwrap();
        assert_eq!(decoded.username, username);
        assert_eq!(decoded.email, email);
    }

    #[test]
    fn row_rejects_oversize_columns() {
        let long_username = "u".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(Row::new(1, &long_username, "e@x").is_err());

        let long_email = "e".repeat(EMAIL_MAX_LENGTH + 1);
        assert!(Row::new(1, "u", &long_email).is_err());
    }

    #[test]
    fn row_display_matches_select_output() {
        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        assert_eq!(row.to_string(), "(1, user1, person1@example.com)");
    }
}
