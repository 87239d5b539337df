//! Synthetic scan fixtures
//!
//! Helpers that turn a clean rendered sheet into something resembling a
//! filled-in, scanned page.

use crate::{TestError, TestResult};
use bubblemark_core::{ImageFormat, Pix, PixelDepth, Point};
use bubblemark_transform::{Homography, ProjectiveFill, warp_perspective};
use std::io::Cursor;

/// Ink value used for pen marks
pub const PEN_GRAY: u32 = 40;

/// Fill a bubble completely with pen ink.
pub fn fill_bubble(pix: &Pix, center: Point, radius: f64) -> Pix {
    let mut pm = pix.to_mut();
    pm.fill_disk(center.x, center.y, radius, PEN_GRAY);
    pm.into()
}

/// Shade the top `fraction` of a bubble's disk, like a hasty pen stroke.
pub fn shade_bubble(pix: &Pix, center: Point, radius: f64, fraction: f64) -> Pix {
    let mut pm = pix.to_mut();
    let top = center.y - radius;
    let cut = top + 2.0 * radius * fraction.clamp(0.0, 1.0);
    for y in (top.floor().max(0.0) as u32)..(cut.ceil().max(0.0) as u32).min(pm.height()) {
        let py = y as f64 + 0.5;
        if py > cut {
            continue;
        }
        let x0 = (center.x - radius).floor().max(0.0) as u32;
        let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(pm.width());
        for x in x0..x1 {
            let (dx, dy) = (x as f64 + 0.5 - center.x, py - center.y);
            if dx * dx + dy * dy <= radius * radius {
                pm.set_pixel_unchecked(x, y, PEN_GRAY);
            }
        }
    }
    pm.into()
}

/// Apply a mild perspective distortion, as from a hand-held phone photo.
///
/// The four page corners move inward by the given pixel offsets
/// `[top_left, top_right, bottom_left, bottom_right]` (x, y). The output
/// keeps the input size; uncovered areas are white.
pub fn perspective_distort(pix: &Pix, offsets: [(f64, f64); 4]) -> TestResult<Pix> {
    let (w, h) = (pix.width() as f64, pix.height() as f64);
    let src = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ];
    let dst = [
        Point::new(offsets[0].0, offsets[0].1),
        Point::new(w - offsets[1].0, offsets[1].1),
        Point::new(offsets[2].0, h - offsets[2].1),
        Point::new(w - offsets[3].0, h - offsets[3].1),
    ];
    let homography =
        Homography::from_quad(&src, &dst).map_err(|e| TestError::Fixture(e.to_string()))?;
    warp_perspective(pix, &homography, pix.width(), pix.height(), ProjectiveFill::White)
        .map_err(|e| TestError::Fixture(e.to_string()))
}

/// Darken the whole page by a constant, as from a dim scanner lamp.
pub fn darken(pix: &Pix, amount: u32) -> TestResult<Pix> {
    if pix.depth() != PixelDepth::Bit8 {
        return Err(TestError::Fixture("darken needs 8 bpp".to_string()));
    }
    let mut pm = pix.to_mut();
    for y in 0..pm.height() {
        for x in 0..pm.width() {
            let v = pm.get_pixel_unchecked(x, y);
            pm.set_pixel_unchecked(x, y, v.saturating_sub(amount));
        }
    }
    Ok(pm.into())
}

fn single_page(pix: &Pix, format: ImageFormat) -> TestResult<Vec<u8>> {
    bubblemark_io::write_image_mem(pix, format).map_err(|e| TestError::Fixture(e.to_string()))
}

/// Encode a single page as a PNG upload.
pub fn png_document(pix: &Pix) -> TestResult<Vec<u8>> {
    single_page(pix, ImageFormat::Png)
}

/// Encode a single page as a JPEG upload, like a phone photo.
pub fn jpeg_document(pix: &Pix) -> TestResult<Vec<u8>> {
    single_page(pix, ImageFormat::Jpeg)
}

/// Encode a single page as a binary PGM/PPM upload.
pub fn pnm_document(pix: &Pix) -> TestResult<Vec<u8>> {
    single_page(pix, ImageFormat::Pnm)
}

/// Encode pages as a multi-page TIFF upload.
pub fn tiff_document(pages: &[Pix]) -> TestResult<Vec<u8>> {
    let refs: Vec<&Pix> = pages.iter().collect();
    let mut cursor = Cursor::new(Vec::new());
    bubblemark_io::tiff::write_tiff_multipage(&refs, &mut cursor)
        .map_err(|e| TestError::Fixture(e.to_string()))?;
    Ok(cursor.into_inner())
}
