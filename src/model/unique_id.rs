//! Timestamp-based unique identifier format.
//!
//! # Responsibility
//! - Format and parse `<nanosecond-timestamp>-<3-digit-sequence>` ids.
//! - Reject malformed identifier strings before they reach storage.
//!
//! # Invariants
//! - The sequence suffix is always three zero-padded decimal digits.
//! - The timestamp segment must fit in an `i64` nanosecond count.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of sequence values available per timestamp (`000`..=`999`).
pub const SEQUENCE_SPACE: u16 = 1000;

static UNIQUE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,19})-(\d{3})$").expect("valid unique id regex"));

pub type UniqueIdResult<T> = Result<T, UniqueIdError>;

/// Parse failures for identifier strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueIdError {
    /// Input is not `<digits>-<3 digits>` with exactly one separator.
    InvalidFormat(String),
    /// Timestamp digits do not fit a signed 64-bit nanosecond count.
    InvalidTimestamp(String),
}

impl Display for UniqueIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(id) => write!(f, "invalid unique id format: `{id}`"),
            Self::InvalidTimestamp(part) => {
                write!(f, "unique id timestamp out of range: `{part}`")
            }
        }
    }
}

impl Error for UniqueIdError {}

/// Parsed halves of a unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueIdParts {
    /// Unix timestamp in nanoseconds.
    pub timestamp_ns: i64,
    /// Collision-probe sequence, `0..SEQUENCE_SPACE`.
    pub sequence: u16,
}

impl UniqueIdParts {
    /// Whole seconds since the Unix epoch (truncating division).
    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp_ns / 1_000_000_000
    }
}

/// Renders the canonical id string for a timestamp/sequence pair.
pub fn format_unique_id(timestamp_ns: i64, sequence: u16) -> String {
    format!("{timestamp_ns}-{sequence:03}")
}

/// Parses and validates an identifier string.
pub fn parse_unique_id(id: &str) -> UniqueIdResult<UniqueIdParts> {
    let captures = UNIQUE_ID_RE
        .captures(id)
        .ok_or_else(|| UniqueIdError::InvalidFormat(id.to_string()))?;

    let timestamp_part = &captures[1];
    let timestamp_ns: i64 = timestamp_part
        .parse()
        .map_err(|_| UniqueIdError::InvalidTimestamp(timestamp_part.to_string()))?;

    // Three digits always fit a u16.
    let sequence: u16 = captures[2].parse().expect("regex guarantees 3 digits");

    Ok(UniqueIdParts {
        timestamp_ns,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::{format_unique_id, parse_unique_id, UniqueIdError, UniqueIdParts};

    #[test]
    fn format_zero_pads_sequence() {
        assert_eq!(format_unique_id(1_700_000_000_000_000_000, 7), "1700000000000000000-007");
        assert_eq!(format_unique_id(42, 999), "42-999");
    }

    #[test]
    fn parse_roundtrips_formatted_ids() {
        let id = format_unique_id(1_700_000_000_000_000_000, 0);
        let parts = parse_unique_id(&id).expect("formatted id should parse");
        assert_eq!(
            parts,
            UniqueIdParts {
                timestamp_ns: 1_700_000_000_000_000_000,
                sequence: 0,
            }
        );
        assert_eq!(parts.epoch_seconds(), 1_700_000_000);
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = parse_unique_id("abc").expect_err("no separator must fail");
        assert!(matches!(err, UniqueIdError::InvalidFormat(_)));
    }

    #[test]
    fn parse_rejects_extra_separator() {
        let err = parse_unique_id("123-456-789").expect_err("two separators must fail");
        assert!(matches!(err, UniqueIdError::InvalidFormat(_)));
    }

    #[test]
    fn parse_rejects_short_sequence() {
        let err = parse_unique_id("1700000000-42").expect_err("2-digit sequence must fail");
        assert!(matches!(err, UniqueIdError::InvalidFormat(_)));
    }

    #[test]
    fn parse_rejects_timestamp_overflow() {
        // 19 digits, but above i64::MAX (9223372036854775807).
        let err = parse_unique_id("9999999999999999999-000")
            .expect_err("overflowing timestamp must fail");
        assert!(matches!(err, UniqueIdError::InvalidTimestamp(_)));
    }

    #[test]
    fn epoch_seconds_truncates_sub_second_precision() {
        let parts = parse_unique_id("1700000000999999999-123").expect("id should parse");
        assert_eq!(parts.epoch_seconds(), 1_700_000_000);
    }
}
