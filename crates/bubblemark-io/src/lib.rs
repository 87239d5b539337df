//! bubblemark-io - Image and document I/O
//!
//! - Format detection from magic numbers
//! - PNG, JPEG, PNM and multi-page TIFF decoding into [`Pix`] pages
//! - PNG, JPEG, PNM and multi-page TIFF encoding
//! - Vector PDF output of [`bubblemark_core::PageDrawing`] pages
//!
//! PDF input is not rasterized here; it needs an external renderer.

mod error;
pub mod format;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "pdf-format")]
pub mod pdf;
#[cfg(feature = "png-format")]
pub mod png;
#[cfg(feature = "pnm")]
pub mod pnm;
#[cfg(feature = "tiff-format")]
pub mod tiff;

pub use bubblemark_core::ImageFormat;
pub use error::{IoError, IoResult};
pub use format::detect_format_from_bytes;

use bubblemark_core::Pix;
use std::io::Cursor;
use std::path::Path;

/// Decode every page of an in-memory image document, in document order.
///
/// Single-image formats yield one page; TIFF yields one page per IFD.
///
/// # Errors
///
/// Returns [`IoError::Conversion`] for PDF input, which needs an external
/// renderer, and decode errors for malformed data.
pub fn read_document(data: &[u8]) -> IoResult<Vec<Pix>> {
    let format = detect_format_from_bytes(data)?;
    tracing::debug!(?format, bytes = data.len(), "decoding document");
    match format {
        #[cfg(feature = "png-format")]
        ImageFormat::Png => Ok(vec![png::read_png(Cursor::new(data))?]),
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => Ok(vec![jpeg::read_jpeg(Cursor::new(data))?]),
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => Ok(vec![pnm::read_pnm(data)?]),
        #[cfg(feature = "tiff-format")]
        ImageFormat::Tiff => tiff::read_tiff_multipage(Cursor::new(data)),
        ImageFormat::Pdf => Err(IoError::Conversion(
            "PDF input requires an external page renderer".to_string(),
        )),
        other => Err(IoError::UnsupportedFormat(format!(
            "{:?} support not compiled in",
            other
        ))),
    }
}

/// Encode a single image in the given format.
pub fn write_image_mem(pix: &Pix, format: ImageFormat) -> IoResult<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        #[cfg(feature = "png-format")]
        ImageFormat::Png => png::write_png(pix, &mut out)?,
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => out = jpeg::write_jpeg(pix, 90)?,
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => pnm::write_pnm(pix, &mut out)?,
        #[cfg(feature = "tiff-format")]
        ImageFormat::Tiff => {
            let mut cursor = Cursor::new(Vec::new());
            tiff::write_tiff_multipage(&[pix], &mut cursor)?;
            out = cursor.into_inner();
        }
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "cannot encode {:?}",
                other
            )));
        }
    }
    Ok(out)
}

/// Write an image file in the given format.
pub fn write_image<P: AsRef<Path>>(pix: &Pix, path: P, format: ImageFormat) -> IoResult<()> {
    std::fs::write(path, write_image_mem(pix, format)?)?;
    Ok(())
}
