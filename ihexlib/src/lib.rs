//! # `ihexlib`
//!
//! `ihexlib` is a Rust library for turning Intel HEX text into a sparse memory image
//! and back, as used by the assembler front end to canonicalize and verify its output.
//!
//! The library provides:
//! - Sparse address → byte image (via [`HexImage`] struct).
//! - Best-effort decoding and canonical encoding (via [`decode`] and [`encode`]).
//! - Semantic comparison of two HEX texts (via [`equal`] and [`diff`]).
//! - Line segmentation for colored HEX views (via [`annotate`]).
//! - Error handling with [`IntelHexError`].
//!
//! ## Example
//!
//! ```
//! use ihexlib::{decode, encode, equal, RecordSize};
//!
//! let raw = ":0100010022DC\n:0100000011EE\n:00000001FF\n";
//! let canonical = encode(&decode(raw), RecordSize::DEFAULT);
//!
//! assert_eq!(canonical, ":020000001122CB\n:00000001FF\n");
//! assert!(equal(raw, &canonical));
//! ```

mod annotate;
mod codec;
mod compare;
mod error;
mod image;
mod record;

// Public APIs
pub use annotate::{AnnotatedLine, Segment, SegmentKind, annotate, annotate_listing};
pub use codec::{Decoded, decode, decode_with_diagnostics, encode};
pub use compare::{ByteDiff, diff, equal};
pub use error::{IntelHexError, IntelHexErrorKind};
pub use image::HexImage;
pub use record::{EOF_RECORD, RecordSize, RecordType, checksum, format_record, verify_checksum};
