//! The `codec` module converts between Intel HEX text and [`HexImage`].
//!
//! Decoding is best-effort: every line is handled on its own and a malformed line is
//! dropped without affecting the rest of the stream. Encoding is canonical: records are
//! greedy runs of contiguous addresses capped at the configured [`RecordSize`], followed
//! by the single end-of-file record.

use crate::error::{IntelHexError, IntelHexErrorKind};
use crate::image::HexImage;
use crate::record::{self, EOF_RECORD, RecordSize, RecordType, ranges, sizes};

/// Result of a decode that also reports which record lines were discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub image: HexImage,
    pub skipped: Vec<IntelHexError>,
}

/// Payload of a single data record, parsed but not yet stored.
struct DataRecord {
    address: u16,
    data: Vec<u8>,
}

/// Decode Intel HEX text into a `HexImage`, silently skipping malformed lines.
///
/// # Example
/// ```
/// use ihexlib::decode;
///
/// let image = decode(":02001000AABB89\n:00000001FF\n");
/// assert_eq!(image.get_byte(0x0010), Some(0xAA));
/// assert_eq!(image.get_byte(0x0011), Some(0xBB));
/// ```
#[must_use]
pub fn decode(text: &str) -> HexImage {
    decode_with_diagnostics(text).image
}

/// Decode Intel HEX text into a `HexImage` and collect a diagnostic for every record
/// line that had to be discarded.
///
/// Lines not starting with ':' and records other than data records are skipped
/// without a diagnostic. Checksums are not validated.
#[must_use]
pub fn decode_with_diagnostics(text: &str) -> Decoded {
    let mut decoded = Decoded::default();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if !line.starts_with(':') {
            continue;
        }

        match parse_data_line(line) {
            Ok(Some(record)) => {
                for (offset, byte) in (0u16..).zip(record.data) {
                    decoded.image.insert(record.address + offset, byte);
                }
            }
            Ok(None) => {}
            Err(kind) => {
                tracing::debug!(line = idx + 1, %kind, "discarding malformed hex record");
                decoded
                    .skipped
                    .push(IntelHexError::MalformedRecord(kind, idx + 1));
            }
        }
    }

    decoded
}

/// Parse one trimmed line starting with ':'. Returns `Ok(None)` for non-data records.
fn parse_data_line(line: &str) -> Result<Option<DataRecord>, IntelHexErrorKind> {
    if line.len() < sizes::SMALLEST_RECORD {
        return Err(IntelHexErrorKind::RecordTooShort);
    }

    let length = parse_hex_u8(line, ranges::RECORD_LEN_RANGE.start)?;
    let address = line
        .get(ranges::RECORD_ADDR_RANGE)
        .and_then(|s| u16::from_str_radix(s, 16).ok())
        .ok_or(IntelHexErrorKind::ContainsInvalidCharacters)?;
    let rtype = parse_hex_u8(line, ranges::RECORD_TYPE_RANGE.start)?;

    if RecordType::from_u8(rtype) != Some(RecordType::Data) {
        return Ok(None);
    }

    let length = usize::from(length);
    let required = sizes::SMALLEST_RECORD + sizes::BYTE_CHAR_LEN * length;
    if line.len() < required {
        return Err(IntelHexErrorKind::RecordTruncated(required, line.len()));
    }

    if length > 0 && usize::from(address) + length - 1 > usize::from(u16::MAX) {
        return Err(IntelHexErrorKind::AddressOverflow(address, length));
    }

    let data = (0..length)
        .map(|i| parse_hex_u8(line, ranges::RECORD_TYPE_RANGE.end + sizes::BYTE_CHAR_LEN * i))
        .collect::<Result<Vec<u8>, _>>()?;

    Ok(Some(DataRecord { address, data }))
}

/// Parse the two hex characters starting at `offset`.
fn parse_hex_u8(line: &str, offset: usize) -> Result<u8, IntelHexErrorKind> {
    line.get(offset..offset + sizes::BYTE_CHAR_LEN)
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .ok_or(IntelHexErrorKind::ContainsInvalidCharacters)
}

/// Encode a `HexImage` into canonical Intel HEX text.
///
/// Every record holds one run of contiguous addresses of at most `record_size` bytes;
/// any address gap closes the current record. The text always ends with the
/// end-of-file record, and every line (including the last) ends with '\n'.
///
/// # Example
/// ```
/// use ihexlib::{encode, HexImage, RecordSize};
///
/// assert_eq!(encode(&HexImage::new(), RecordSize::DEFAULT), ":00000001FF\n");
/// ```
#[must_use]
pub fn encode(image: &HexImage, record_size: RecordSize) -> String {
    let mut out = String::new();
    let mut chunk_start: Option<u16> = None;
    let mut prev_addr: Option<u16> = None;
    let mut chunk_data = Vec::with_capacity(record_size.get());

    for (&addr, &byte) in image {
        // If gap detected or chunk full -> flush
        if let Some(prev) = prev_addr
            && (prev.checked_add(1) != Some(addr) || chunk_data.len() >= record_size.get())
        {
            push_record(&mut out, chunk_start.unwrap_or_default(), &chunk_data);
            chunk_data.clear();
            chunk_start = None;
        }

        // Start new chunk if empty
        if chunk_start.is_none() {
            chunk_start = Some(addr);
        }

        chunk_data.push(byte);
        prev_addr = Some(addr);
    }

    // Flush last data chunk
    if let Some(start) = chunk_start {
        push_record(&mut out, start, &chunk_data);
    }

    out.push_str(EOF_RECORD);
    out.push('\n');
    out
}

fn push_record(out: &mut String, address: u16, data: &[u8]) {
    // Chunks never exceed `RecordSize`, which is at most 255 bytes
    if let Ok(line) = record::format_record(address, data) {
        out.push_str(&line);
        out.push('\n');
    }
}
