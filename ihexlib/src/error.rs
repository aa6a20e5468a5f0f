//! The `error` module defines the [`IntelHexError`] enum that describes the errors that
//! can occur when decoding, creating, or configuring Intel HEX records.
//! It contains the three pieces of information:
//! 1. When the error occurs, e.g., while decoding a line or creating a record.
//! 2. What kind of error was encountered (via [`IntelHexErrorKind`] enum).
//! 3. What is the line number (if applicable), e.g., which line of the hex text was discarded.
//!
//! Decoding is best-effort: malformed lines never abort a decode, they are only
//! reported back through [`crate::codec::decode_with_diagnostics`].

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntelHexError {
    MalformedRecord(IntelHexErrorKind, usize),
    CreateRecordError(IntelHexErrorKind),
    UpdateError(IntelHexErrorKind),
}

impl fmt::Display for IntelHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord(base_err, line) => {
                write!(f, "Discarded malformed record at line #{line}: {base_err}")
            }
            Self::CreateRecordError(base_err) => {
                write!(
                    f,
                    "Error encountered during creation of hex record:\n{base_err}",
                )
            }
            Self::UpdateError(base_err) => {
                write!(
                    f,
                    "Error encountered during update of hex settings:\n{base_err}",
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntelHexErrorKind {
    /// Record is shorter than the smallest valid
    RecordTooShort,
    /// Record payload is longer than a single record can carry
    RecordTooLong,
    /// Record contains non-hexadecimal characters
    ContainsInvalidCharacters,
    /// Record ends before its declared payload does
    RecordTruncated(usize, usize),
    /// Record payload runs past the top of the 16-bit address space
    AddressOverflow(u16, usize),
    /// Invalid length of data bytes
    RecordInvalidPayloadLength,
}

impl fmt::Display for IntelHexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordTooShort => {
                write!(f, "Record too short")
            }
            Self::RecordTooLong => {
                write!(f, "Record too long")
            }
            Self::ContainsInvalidCharacters => {
                write!(f, "Record contains invalid character(s)")
            }
            Self::RecordTruncated(expected, actual) => {
                write!(
                    f,
                    "Record truncated - expected at least {expected} characters, found {actual}"
                )
            }
            Self::AddressOverflow(address, length) => {
                write!(
                    f,
                    "Record of {length} bytes at 0x{address:04X} runs past address 0xFFFF"
                )
            }
            Self::RecordInvalidPayloadLength => {
                write!(f, "Record payload size must be between 1 and 255 bytes")
            }
        }
    }
}

impl Error for IntelHexError {}
impl Error for IntelHexErrorKind {}
