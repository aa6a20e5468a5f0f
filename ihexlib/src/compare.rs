//! Semantic comparison of two HEX texts.
//!
//! Two texts are equal when they describe the same memory contents. Record boundaries,
//! record order, chunk width and incidental whitespace do not matter.

use crate::codec::decode;
use std::collections::BTreeSet;

/// One address at which two images disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteDiff {
    pub address: u16,
    pub left: Option<u8>,
    pub right: Option<u8>,
}

/// Check whether two HEX texts decode to the same address → byte mapping.
///
/// # Example
/// ```
/// use ihexlib::equal;
///
/// let a = ":020000001122CB\n:00000001FF\n";
/// let b = ":0100010022DC\n:0100000011EE\n:00000001FF\n";
/// assert!(equal(a, b));
/// ```
#[must_use]
pub fn equal(hex_a: &str, hex_b: &str) -> bool {
    decode(hex_a) == decode(hex_b)
}

/// List every address whose byte differs between the two HEX texts, in increasing
/// address order. An address present on one side only is reported with `None` on the
/// other side.
#[must_use]
pub fn diff(hex_a: &str, hex_b: &str) -> Vec<ByteDiff> {
    let left = decode(hex_a);
    let right = decode(hex_b);

    let addresses: BTreeSet<u16> = left
        .iter()
        .chain(right.iter())
        .map(|(addr, _)| *addr)
        .collect();

    addresses
        .into_iter()
        .filter_map(|address| {
            let (l, r) = (left.get_byte(address), right.get_byte(address));
            (l != r).then_some(ByteDiff {
                address,
                left: l,
                right: r,
            })
        })
        .collect()
}
