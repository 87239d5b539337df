//! Box blur by block convolution over an integral image

use crate::{FilterError, FilterResult};
use bubblemark_core::{Pix, PixelDepth};

pub(crate) fn check_8bpp(pix: &Pix) -> FilterResult<()> {
    if pix.depth() != PixelDepth::Bit8 {
        return Err(FilterError::UnsupportedDepth {
            expected: "8-bpp grayscale",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

/// Summed area table with one extra leading row and column of zeros.
///
/// `at(x, y)` is the sum of all pixels strictly above and left of `(x, y)`.
pub struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
}

impl IntegralImage {
    /// Build the table from an 8 bpp image.
    pub fn new(pix: &Pix) -> FilterResult<Self> {
        check_8bpp(pix)?;
        let (w, h) = (pix.width(), pix.height());
        let stride = w as usize + 1;
        let mut sums = vec![0u64; stride * (h as usize + 1)];
        for y in 0..h {
            let mut row_sum = 0u64;
            for x in 0..w {
                row_sum += pix.get_pixel_unchecked(x, y) as u64;
                let i = (y as usize + 1) * stride + x as usize + 1;
                sums[i] = sums[i - stride] + row_sum;
            }
        }
        Ok(Self {
            width: w,
            height: h,
            sums,
        })
    }

    #[inline]
    fn at(&self, x: u32, y: u32) -> u64 {
        self.sums[y as usize * (self.width as usize + 1) + x as usize]
    }

    /// Sum and pixel count of the window `[x0, x1) x [y0, y1)`, clipped.
    pub fn window(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> (u64, u64) {
        let cx = |v: i64| v.clamp(0, self.width as i64) as u32;
        let cy = |v: i64| v.clamp(0, self.height as i64) as u32;
        let (xa, xb, ya, yb) = (cx(x0), cx(x1), cy(y0), cy(y1));
        if xb <= xa || yb <= ya {
            return (0, 0);
        }
        let sum = self.at(xb, yb) + self.at(xa, ya) - self.at(xa, yb) - self.at(xb, ya);
        (sum, (xb - xa) as u64 * (yb - ya) as u64)
    }

    /// Mean of the `(2*half + 1)` square window centered on `(x, y)`.
    pub fn local_mean(&self, x: u32, y: u32, half: u32) -> f64 {
        let (x, y, r) = (x as i64, y as i64, half as i64);
        let (sum, n) = self.window(x - r, y - r, x + r + 1, y + r + 1);
        if n == 0 { 0.0 } else { sum as f64 / n as f64 }
    }
}

/// Box blur an 8 bpp image with a `(2*half + 1)` square kernel.
///
/// Windows are clipped at the border and normalized by the clipped area.
/// `half == 0` returns a copy.
pub fn box_blur(pix: &Pix, half: u32) -> FilterResult<Pix> {
    check_8bpp(pix)?;
    if half == 0 {
        return Ok(pix.clone());
    }
    let table = IntegralImage::new(pix)?;
    let (w, h) = (pix.width(), pix.height());
    let mut out = pix.create_template().to_mut();
    for y in 0..h {
        for x in 0..w {
            let mean = table.local_mean(x, y, half);
            out.set_pixel_unchecked(x, y, (mean + 0.5).min(255.0) as u32);
        }
    }
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_window_sum() {
        let mut pm = Pix::new(4, 3, PixelDepth::Bit8).unwrap().to_mut();
        for y in 0..3 {
            for x in 0..4 {
                pm.set_pixel(x, y, x + 10 * y).unwrap();
            }
        }
        let table = IntegralImage::new(&pm.into()).unwrap();
        // pixels (1..3, 1..3): 11 + 12 + 21 + 22
        assert_eq!(table.window(1, 1, 3, 3), (66, 4));
        assert_eq!(table.window(-5, -5, 0, 10), (0, 0));
    }

    #[test]
    fn test_blur_flat_image_is_unchanged() {
        let pix = Pix::new_filled(9, 9, PixelDepth::Bit8, 180).unwrap();
        let out = box_blur(&pix, 2).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(180));
        assert_eq!(out.get_pixel(4, 4), Some(180));
    }

    #[test]
    fn test_blur_rejects_rgb() {
        let pix = Pix::new(2, 2, PixelDepth::Bit32).unwrap();
        assert!(box_blur(&pix, 1).is_err());
    }
}
