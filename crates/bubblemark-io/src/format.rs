//! Image format detection
//!
//! Detects formats by examining magic numbers in the file header.

use crate::{IoError, IoResult};
use bubblemark_core::ImageFormat;

/// Magic numbers for format detection
mod magic {
    /// PNG: 89 50 4E 47 0D 0A 1A 0A
    pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// JPEG: FF D8 FF
    pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    /// TIFF little-endian: II 2A 00
    pub const TIFF_LE: &[u8] = &[0x49, 0x49, 0x2A, 0x00];

    /// TIFF big-endian: MM 00 2A
    pub const TIFF_BE: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];

    /// PDF: "%PDF-"
    pub const PDF: &[u8] = b"%PDF-";
}

/// Detect the format of an in-memory image or document.
///
/// # Errors
///
/// Returns [`IoError::InvalidData`] when fewer than two bytes are given and
/// [`IoError::UnsupportedFormat`] when no signature matches.
pub fn detect_format_from_bytes(data: &[u8]) -> IoResult<ImageFormat> {
    if data.len() < 2 {
        return Err(IoError::InvalidData(
            "not enough data to detect format".to_string(),
        ));
    }

    if data.starts_with(magic::PNG) {
        return Ok(ImageFormat::Png);
    }
    if data.starts_with(magic::JPEG) {
        return Ok(ImageFormat::Jpeg);
    }
    if data.starts_with(magic::TIFF_LE) || data.starts_with(magic::TIFF_BE) {
        return Ok(ImageFormat::Tiff);
    }
    if data.starts_with(magic::PDF) {
        return Ok(ImageFormat::Pdf);
    }
    if data[0] == b'P' && (b'1'..=b'6').contains(&data[1]) {
        return Ok(ImageFormat::Pnm);
    }

    Err(IoError::UnsupportedFormat(
        "unknown image format".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_signatures() {
        assert_eq!(
            detect_format_from_bytes(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap(),
            ImageFormat::Png
        );
        assert_eq!(
            detect_format_from_bytes(b"II*\0rest").unwrap(),
            ImageFormat::Tiff
        );
        assert_eq!(
            detect_format_from_bytes(b"%PDF-1.7").unwrap(),
            ImageFormat::Pdf
        );
        assert_eq!(detect_format_from_bytes(b"P5\n").unwrap(), ImageFormat::Pnm);
    }

    #[test]
    fn test_detect_rejects_garbage() {
        assert!(detect_format_from_bytes(b"x").is_err());
        assert!(matches!(
            detect_format_from_bytes(b"hello world"),
            Err(IoError::UnsupportedFormat(_))
        ));
    }
}
