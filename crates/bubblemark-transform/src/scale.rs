//! Image scaling
//!
//! Linear interpolation for 8 bpp grayscale and nearest-neighbor sampling
//! for any depth. Scanned pages are normalized to a target resolution with
//! these before calibration.

use crate::{TransformError, TransformResult};
use bubblemark_core::{Pix, PixelDepth};

/// Scaling method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMethod {
    /// Bilinear interpolation for upscaling, area averaging for downscaling
    #[default]
    Linear,
    /// Nearest-neighbor sampling
    Sampling,
}

/// Scale an image by independent x and y factors.
pub fn scale(pix: &Pix, scale_x: f32, scale_y: f32, method: ScaleMethod) -> TransformResult<Pix> {
    if !(scale_x.is_finite() && scale_y.is_finite()) || scale_x <= 0.0 || scale_y <= 0.0 {
        return Err(TransformError::InvalidScaleFactor(format!(
            "scale factors must be positive: {} x {}",
            scale_x, scale_y
        )));
    }
    let w = ((pix.width() as f32 * scale_x).round() as u32).max(1);
    let h = ((pix.height() as f32 * scale_y).round() as u32).max(1);
    match method {
        ScaleMethod::Linear => scale_linear(pix, w, h),
        ScaleMethod::Sampling => scale_sampled(pix, w, h),
    }
}

fn scale_sampled(pix: &Pix, width: u32, height: u32) -> TransformResult<Pix> {
    let sx = pix.width() as f64 / width as f64;
    let sy = pix.height() as f64 / height as f64;
    let mut out = Pix::new(width, height, pix.depth())?.to_mut();
    for y in 0..height {
        let src_y = (((y as f64 + 0.5) * sy) as u32).min(pix.height() - 1);
        for x in 0..width {
            let src_x = (((x as f64 + 0.5) * sx) as u32).min(pix.width() - 1);
            out.set_pixel_unchecked(x, y, pix.get_pixel_unchecked(src_x, src_y));
        }
    }
    Ok(out.into())
}

fn scale_linear(pix: &Pix, width: u32, height: u32) -> TransformResult<Pix> {
    if pix.depth() != PixelDepth::Bit8 {
        return Err(TransformError::UnsupportedDepth(format!(
            "linear scaling needs 8 bpp, got {} bpp",
            pix.depth().bits()
        )));
    }
    let sx = pix.width() as f64 / width as f64;
    let sy = pix.height() as f64 / height as f64;
    let mut out = Pix::new(width, height, PixelDepth::Bit8)?.to_mut();

    if sx > 1.0 || sy > 1.0 {
        // shrinking: average the source footprint of each output pixel
        for y in 0..height {
            let (ya, yb) = footprint(y, sy, pix.height());
            for x in 0..width {
                let (xa, xb) = footprint(x, sx, pix.width());
                let mut sum = 0u64;
                for v in ya..yb {
                    for u in xa..xb {
                        sum += pix.get_pixel_unchecked(u, v) as u64;
                    }
                }
                let n = ((yb - ya) * (xb - xa)) as u64;
                out.set_pixel_unchecked(x, y, ((sum + n / 2) / n) as u32);
            }
        }
    } else {
        let (wmax, hmax) = (pix.width() - 1, pix.height() - 1);
        for y in 0..height {
            let fy = ((y as f64 + 0.5) * sy - 0.5).clamp(0.0, hmax as f64);
            let y0 = fy.floor() as u32;
            let y1 = (y0 + 1).min(hmax);
            let ay = fy - y0 as f64;
            for x in 0..width {
                let fx = ((x as f64 + 0.5) * sx - 0.5).clamp(0.0, wmax as f64);
                let x0 = fx.floor() as u32;
                let x1 = (x0 + 1).min(wmax);
                let ax = fx - x0 as f64;
                let top = pix.get_pixel_unchecked(x0, y0) as f64 * (1.0 - ax)
                    + pix.get_pixel_unchecked(x1, y0) as f64 * ax;
                let bottom = pix.get_pixel_unchecked(x0, y1) as f64 * (1.0 - ax)
                    + pix.get_pixel_unchecked(x1, y1) as f64 * ax;
                let val = top * (1.0 - ay) + bottom * ay;
                out.set_pixel_unchecked(x, y, val.round().clamp(0.0, 255.0) as u32);
            }
        }
    }
    out.set_resolution(
        (pix.xres() as f64 / sx).round() as i32,
        (pix.yres() as f64 / sy).round() as i32,
    );
    Ok(out.into())
}

/// Source index range `[a, b)` covered by output index `i`, never empty.
fn footprint(i: u32, s: f64, limit: u32) -> (u32, u32) {
    let a = ((i as f64 * s).floor() as u32).min(limit - 1);
    let b = (((i + 1) as f64 * s).ceil() as u32).clamp(a + 1, limit);
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downscale_averages() {
        let mut pm = Pix::new(4, 2, PixelDepth::Bit8).unwrap().to_mut();
        pm.fill_rect(0.0, 0.0, 2.0, 2.0, 100);
        pm.fill_rect(2.0, 0.0, 4.0, 2.0, 200);
        pm.set_resolution(200, 200);
        let out = scale(&pm.into(), 0.5, 0.5, ScaleMethod::Linear).unwrap();
        assert_eq!((out.width(), out.height()), (2, 1));
        assert_eq!(out.get_pixel(0, 0), Some(100));
        assert_eq!(out.get_pixel(1, 0), Some(200));
        assert_eq!(out.xres(), 100);
    }

    #[test]
    fn test_upscale_flat_stays_flat() {
        let pix = Pix::new_filled(3, 3, PixelDepth::Bit8, 77).unwrap();
        let out = scale(&pix, 3.0, 2.5, ScaleMethod::Linear).unwrap();
        assert_eq!((out.width(), out.height()), (9, 8));
        assert_eq!(out.get_pixel(8, 7), Some(77));
    }

    #[test]
    fn test_sampling_any_depth() {
        let mut pm = Pix::new(2, 2, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_pixel(1, 1, 1).unwrap();
        let out = scale(&pm.into(), 2.0, 2.0, ScaleMethod::Sampling).unwrap();
        assert_eq!(out.get_pixel(3, 3), Some(1));
        assert_eq!(out.get_pixel(0, 0), Some(0));
    }

    #[test]
    fn test_invalid_factor() {
        let pix = Pix::new(2, 2, PixelDepth::Bit8).unwrap();
        assert!(scale(&pix, 0.0, 1.0, ScaleMethod::Linear).is_err());
    }
}
