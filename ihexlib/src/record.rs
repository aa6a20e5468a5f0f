//! The `record` module defines [`RecordType`], [`RecordSize`] and the helpers used for
//! generating (and checking) single Intel HEX record lines.

use crate::error::{IntelHexError, IntelHexErrorKind};

pub(crate) mod ranges {
    use std::ops::Range;
    pub const RECORD_LEN_RANGE: Range<usize> = 1..3;
    pub const RECORD_ADDR_RANGE: Range<usize> = 3..7;
    pub const RECORD_TYPE_RANGE: Range<usize> = 7..9;
}
pub(crate) mod sizes {
    pub const BYTE_CHAR_LEN: usize = 2;
    pub const SMALLEST_RECORD: usize = 1 + (1 + 2 + 1 + 1) * 2; // ':' + len + addr + rtype + checksum
    pub const HEADER_LEN: usize = 9; // ':' + len + addr + rtype
}

/// Terminating record of every encoded stream.
pub const EOF_RECORD: &str = ":00000001FF";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    Data = 0x0,
    EndOfFile = 0x1,
}

impl RecordType {
    /// Map a raw record type byte. Vendor extensions and address records yield `None`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::EndOfFile),
            _ => None,
        }
    }
}

/// Maximum payload (number of data bytes) per encoded record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordSize(u8);

impl RecordSize {
    /// Canonical chunk width used unless configured otherwise.
    pub const DEFAULT: Self = Self(16);

    /// Create a record size.
    ///
    /// # Errors
    /// Returns an error if the provided payload size is 0.
    ///
    /// # Example
    /// ```
    /// use ihexlib::RecordSize;
    ///
    /// assert_eq!(RecordSize::new(32).unwrap().get(), 32);
    /// assert!(RecordSize::new(0).is_err());
    /// ```
    pub const fn new(size: u8) -> Result<Self, IntelHexError> {
        if size == 0 {
            return Err(IntelHexError::UpdateError(
                IntelHexErrorKind::RecordInvalidPayloadLength,
            ));
        }
        Ok(Self(size))
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for RecordSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Calculate checksum from u8 array (two's complement of the byte sum).
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}

#[allow(clippy::cast_possible_truncation)]
/// Create the data record string from address and payload.
///
/// # Errors
/// Returns an error if the payload does not fit into a single record.
///
/// # Example
/// ```
/// use ihexlib::format_record;
///
/// let line = format_record(0x0100, &[0x21, 0x46]).unwrap();
/// assert_eq!(line, ":02010000214696");
/// ```
pub fn format_record(address: u16, data: &[u8]) -> Result<String, IntelHexError> {
    if data.len() > u8::MAX as usize {
        return Err(IntelHexError::CreateRecordError(
            IntelHexErrorKind::RecordTooLong,
        ));
    }

    let [addr_high, addr_low] = address.to_be_bytes();
    let sum = data
        .iter()
        .fold((data.len() as u8).wrapping_add(addr_high).wrapping_add(addr_low), |acc, b| {
            acc.wrapping_add(*b)
        });
    let checksum = sum.wrapping_neg();

    let mut record = String::with_capacity(sizes::SMALLEST_RECORD + data.len() * 2);
    record.push_str(&format!(":{:02X}{address:04X}00", data.len()));
    for byte in data {
        record.push_str(&format!("{byte:02X}"));
    }
    record.push_str(&format!("{checksum:02X}"));

    Ok(record)
}

/// Check that all byte pairs of a record line (count, address, type, data, checksum)
/// sum to zero modulo 256.
#[must_use]
pub fn verify_checksum(line: &str) -> bool {
    let Some(hexdigit_part) = line.trim().strip_prefix(':') else {
        return false;
    };
    if hexdigit_part.len() % 2 != 0 || hexdigit_part.len() < sizes::SMALLEST_RECORD - 1 {
        return false;
    }

    let mut sum: u8 = 0;
    for i in (0..hexdigit_part.len()).step_by(sizes::BYTE_CHAR_LEN) {
        let Some(Ok(byte)) = hexdigit_part
            .get(i..i + sizes::BYTE_CHAR_LEN)
            .map(|s| u8::from_str_radix(s, 16))
        else {
            return false;
        };
        sum = sum.wrapping_add(byte);
    }
    sum == 0
}
