//! Presentation helpers for the HEX view: every record line is split into labeled
//! sub-ranges (header, data, checksum) that a front end can color.
//!
//! Annotation never fails. A record line that is too short to carry all fields is
//! returned as a single `Malformed` segment instead.

use crate::record::sizes;
use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// ':' + byte count + address + record type
    Header,
    Data,
    Checksum,
    Malformed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub range: Range<usize>,
    pub kind: SegmentKind,
}

/// A numbered line of a HEX listing with its segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatedLine {
    /// 1-based position among the non-empty lines
    pub number: usize,
    pub text: String,
    pub segments: Vec<Segment>,
}

impl AnnotatedLine {
    /// Render the line with its number gutter, e.g. `0001 | :00000001FF`.
    #[must_use]
    pub fn numbered(&self) -> String {
        format!("{:04} | {}", self.number, self.text)
    }
}

/// Split one HEX line into segments.
///
/// # Example
/// ```
/// use ihexlib::{annotate, SegmentKind};
///
/// let segments = annotate(":0100000001FE");
/// let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
///
/// assert_eq!(kinds, [SegmentKind::Header, SegmentKind::Data, SegmentKind::Checksum]);
/// assert_eq!(segments[1].range, 9..11);
/// ```
#[must_use]
pub fn annotate(line: &str) -> Vec<Segment> {
    if !line.starts_with(':') {
        return vec![];
    }

    let len = line.len();
    if len < sizes::SMALLEST_RECORD {
        return vec![Segment {
            range: 0..len,
            kind: SegmentKind::Malformed,
        }];
    }

    let mut segments = Vec::with_capacity(3);
    segments.push(Segment {
        range: 0..sizes::HEADER_LEN,
        kind: SegmentKind::Header,
    });
    if len > sizes::SMALLEST_RECORD {
        segments.push(Segment {
            range: sizes::HEADER_LEN..len - sizes::BYTE_CHAR_LEN,
            kind: SegmentKind::Data,
        });
    }
    segments.push(Segment {
        range: len - sizes::BYTE_CHAR_LEN..len,
        kind: SegmentKind::Checksum,
    });
    segments
}

/// Annotate every non-empty line of a HEX text.
///
/// Lines are numbered from 1 by their position in `text`, so skipped blank lines
/// still count.
#[must_use]
pub fn annotate_listing(text: &str) -> Vec<AnnotatedLine> {
    text.lines()
        .map(str::trim_end)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| AnnotatedLine {
            number: idx + 1,
            text: line.to_string(),
            segments: annotate(line),
        })
        .collect()
}
