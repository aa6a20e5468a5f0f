//! The `image` module provides the [`HexImage`] struct, the sparse memory image a HEX
//! text describes.
//!
//! It keeps address → byte pairs in a `BTreeMap`, so every consumer sees the bytes in
//! strictly increasing address order no matter how the records were laid out.
//! The module also provides file helpers that load a HEX file best-effort and write
//! the canonical encoding back to disk.

use crate::codec;
use crate::record::RecordSize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexImage {
    /// Data buffer of the image
    buffer: BTreeMap<u16, u8>,
}

impl<'a> IntoIterator for &'a HexImage {
    type Item = (&'a u16, &'a u8);
    type IntoIter = std::collections::btree_map::Iter<'a, u16, u8>;
    fn into_iter(self) -> Self::IntoIter {
        self.buffer.iter()
    }
}

impl FromIterator<(u16, u8)> for HexImage {
    fn from_iter<I: IntoIterator<Item = (u16, u8)>>(iter: I) -> Self {
        Self {
            buffer: iter.into_iter().collect(),
        }
    }
}

impl Extend<(u16, u8)> for HexImage {
    fn extend<I: IntoIterator<Item = (u16, u8)>>(&mut self, iter: I) {
        self.buffer.extend(iter);
    }
}

impl HexImage {
    /// Creates empty `HexImage` struct instance.
    ///
    /// # Examples
    /// ```
    /// use ihexlib::HexImage;
    ///
    /// let image = HexImage::new();
    /// assert!(image.is_empty());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: BTreeMap::new(),
        }
    }

    /// Creates a `HexImage` and fills it with data decoded from the provided hex file.
    /// Malformed lines are skipped, see [`codec::decode`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_hex<P: AsRef<Path>>(filepath: P) -> Result<Self, Box<dyn Error>> {
        let mut image = Self::new();
        image.load_hex(filepath)?;
        Ok(image)
    }

    /// Replaces the contents of the image with data decoded from the provided hex file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid UTF-8.
    pub fn load_hex<P: AsRef<Path>>(&mut self, filepath: P) -> Result<(), Box<dyn Error>> {
        let text = std::fs::read_to_string(&filepath)?;
        *self = codec::decode(&text);
        Ok(())
    }

    /// Generates the canonical Intel HEX file at the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    ///
    /// # Example
    /// ```
    /// use ihexlib::{HexImage, RecordSize};
    ///
    /// let image: HexImage = [(0x0000, 0xAA), (0x0001, 0xBB)].into_iter().collect();
    /// image.write_hex("build/doc/image.hex", RecordSize::DEFAULT).unwrap();
    ///
    /// assert_eq!(HexImage::from_hex("build/doc/image.hex").unwrap(), image);
    /// ```
    pub fn write_hex<P: AsRef<Path>>(
        &self,
        filepath: P,
        record_size: RecordSize,
    ) -> Result<(), Box<dyn Error>> {
        // Ensure the parent directory exists
        if let Some(parent) = filepath.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(filepath, codec::encode(self, record_size))?;
        Ok(())
    }

    /// Store a byte at the address, returning the byte it replaced (last write wins).
    pub fn insert(&mut self, address: u16, byte: u8) -> Option<u8> {
        self.buffer.insert(address, byte)
    }

    /// Get byte from `HexImage` at the provided address.
    ///
    /// # Example
    /// ```
    /// use ihexlib::HexImage;
    ///
    /// let mut image = HexImage::new();
    /// image.insert(0x1234, 0xFF);
    ///
    /// assert_eq!(image.get_byte(0x1234), Some(0xFF));
    /// assert_eq!(image.get_byte(0x1235), None);
    /// ```
    #[must_use]
    pub fn get_byte(&self, address: u16) -> Option<u8> {
        self.buffer.get(&address).copied()
    }

    /// Number of addresses holding data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the smallest address present in the data buffer.
    #[must_use]
    pub fn get_min_addr(&self) -> Option<u16> {
        self.buffer.first_key_value().map(|(key, _)| *key)
    }

    /// Get the highest address present in the data buffer.
    #[must_use]
    pub fn get_max_addr(&self) -> Option<u16> {
        self.buffer.last_key_value().map(|(key, _)| *key)
    }

    /// Get an iterator over (address, byte) pairs in increasing address order.
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, u16, u8> {
        self.into_iter()
    }

    /// Get copy of the data buffer as `BTreeMap`.
    #[must_use]
    pub fn to_btree_map(&self) -> BTreeMap<u16, u8> {
        self.buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites() {
        // Arrange
        let mut image = HexImage::new();
        let addr = 0x1234;

        // Act
        let first = image.insert(addr, 0x11);
        let second = image.insert(addr, 0x22);

        // Assert
        assert_eq!(first, None);
        assert_eq!(second, Some(0x11));
        assert_eq!(image.get_byte(addr), Some(0x22));
        assert_eq!(image.len(), 1);
    }

    #[test]
    fn test_iteration_is_address_ordered() {
        // Arrange
        let image: HexImage = [(0x0300, 3), (0x0001, 1), (0x0200, 2), (0xFFFF, 4)]
            .into_iter()
            .collect();

        // Act
        let addrs: Vec<u16> = image.iter().map(|(addr, _)| *addr).collect();

        // Assert
        assert_eq!(addrs, vec![0x0001, 0x0200, 0x0300, 0xFFFF]);
    }

    #[test]
    fn test_get_min_and_max_addr_valid() {
        // Arrange
        let mut image = HexImage::new();

        let addr_start: u16 = 10;
        let length: u16 = 10;

        for addr in addr_start..=addr_start + length {
            image.insert(addr, 0);
        }

        // Act
        let min_addr = image.get_min_addr();
        let max_addr = image.get_max_addr();

        // Assert
        assert_eq!(min_addr, Some(addr_start));
        assert_eq!(max_addr, Some(addr_start + length));
    }

    #[test]
    fn test_get_min_and_max_addr_empty() {
        // Arrange
        let image = HexImage::new();

        // Act
        let min_addr = image.get_min_addr();
        let max_addr = image.get_max_addr();

        // Assert
        assert!(min_addr.is_none());
        assert!(max_addr.is_none());
        assert!(image.is_empty());
    }

    #[test]
    fn test_extend_keeps_last_value() {
        // Arrange
        let mut image: HexImage = [(0x10, 0xAA)].into_iter().collect();

        // Act
        image.extend([(0x10, 0xBB), (0x11, 0xCC)]);

        // Assert
        assert_eq!(
            image.to_btree_map(),
            BTreeMap::from([(0x10, 0xBB), (0x11, 0xCC)])
        );
    }
}
