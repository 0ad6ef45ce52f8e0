//! Image payload handling.
//!
//! An [`Image`] is the binary content destined for the chip, read entirely
//! into memory before the transfer starts. The programmer protocol never
//! mutates it; the verify phase compares the read-back stream against it
//! byte for byte.

use std::path::Path;

use crate::error::Result;

/// Maximum payload a single chip can hold (SST39SF040, 512 KiB). Larger
/// files are almost certainly a usage mistake, but the protocol itself has
/// no limit, so this is informational only.
pub const MAX_CHIP_CAPACITY: usize = 512 * 1024;

/// An immutable in-memory firmware/ROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
}

impl Image {
    /// Wrap raw bytes as an image.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Read an image from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self { data })
    }

    /// Image length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty (a degenerate but valid transfer).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 32-bit additive checksum (wrapping sum of all bytes).
    ///
    /// This matches the checksum the programmer firmware prints, so it can
    /// be compared against the device side after a run.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        checksum(&self.data)
    }
}

impl AsRef<[u8]> for Image {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// 32-bit additive checksum of a byte slice.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_sums_bytes() {
        assert_eq!(checksum(&[1, 2, 3]), 6);
        assert_eq!(checksum(&[0xFF; 4]), 0x3FC);
    }

    #[test]
    fn test_checksum_wraps() {
        // 0xFFFFFFFF / 0xFF = 16843009 bytes of 0xFF overflow u32 by one step.
        let data = vec![0xFFu8; 16_843_010];
        assert_eq!(checksum(&data), 0xFFFF_FFFFu32.wrapping_add(0xFF));
    }

    #[test]
    fn test_image_accessors() {
        let img = Image::new(vec![0x10, 0x20]);
        assert_eq!(img.len(), 2);
        assert!(!img.is_empty());
        assert_eq!(img.as_bytes(), &[0x10, 0x20]);
        assert_eq!(img.checksum(), 0x30);
    }

    #[test]
    fn test_empty_image() {
        let img = Image::new(Vec::new());
        assert!(img.is_empty());
        assert_eq!(img.len(), 0);
        assert_eq!(img.checksum(), 0);
    }
}
