//! Depth conversion
//!
//! Scans arrive as binary, grayscale or color rasters. Everything past the
//! rasterizer works on 8 bpp grayscale; overlays are drawn on 32 bpp RGB.

use super::{Pix, PixelDepth};
use crate::color;
use crate::error::Result;

/// Convert any supported depth to 8 bpp grayscale.
///
/// 1 bpp foreground (1) becomes black, background becomes white.
/// 32 bpp color uses [`color::luminance`]. Resolution is preserved.
pub fn convert_to_gray(pix: &Pix) -> Result<Pix> {
    if pix.depth() == PixelDepth::Bit8 {
        return Ok(pix.clone());
    }
    let (w, h) = (pix.width(), pix.height());
    let mut out = Pix::new(w, h, PixelDepth::Bit8)?.to_mut();
    out.set_resolution(pix.xres(), pix.yres());
    out.set_informat(pix.informat());
    for y in 0..h {
        for x in 0..w {
            let v = pix.get_pixel_unchecked(x, y);
            let g = match pix.depth() {
                PixelDepth::Bit1 => {
                    if v != 0 {
                        0
                    } else {
                        255
                    }
                }
                PixelDepth::Bit8 => v,
                PixelDepth::Bit32 => {
                    let (r, g, b) = color::extract_rgb(v);
                    color::luminance(r, g, b) as u32
                }
            };
            out.set_pixel_unchecked(x, y, g);
        }
    }
    Ok(out.into())
}

/// Convert any supported depth to 32 bpp RGB.
pub fn convert_to_rgb(pix: &Pix) -> Result<Pix> {
    if pix.depth() == PixelDepth::Bit32 {
        return Ok(pix.clone());
    }
    let gray = convert_to_gray(pix)?;
    let (w, h) = (gray.width(), gray.height());
    let mut out = Pix::new(w, h, PixelDepth::Bit32)?.to_mut();
    out.set_resolution(pix.xres(), pix.yres());
    for y in 0..h {
        for x in 0..w {
            let g = gray.get_pixel_unchecked(x, y) as u8;
            out.set_pixel_unchecked(x, y, color::compose_rgb(g, g, g));
        }
    }
    Ok(out.into())
}
