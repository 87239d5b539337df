//! Binarization
//!
//! Converts 8 bpp grayscale to 1 bpp with dark pixels as foreground (1):
//! - Fixed threshold
//! - Otsu's method (automatic global threshold)
//! - Adaptive mean threshold for unevenly lit photographs

use crate::block_conv::{IntegralImage, check_8bpp};
use crate::{FilterError, FilterResult};
use bubblemark_core::{Pix, PixelDepth};
use serde::{Deserialize, Serialize};

/// How a page is binarized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BinarizeMethod {
    /// Global threshold chosen by Otsu's method
    Otsu,
    /// Pixels strictly darker than `threshold` are foreground
    Fixed { threshold: u8 },
    /// Pixels darker than the local mean minus `offset` are foreground
    AdaptiveMean { half_window: u32, offset: f64 },
}

impl Default for BinarizeMethod {
    fn default() -> Self {
        Self::Otsu
    }
}

/// 256-bin intensity histogram of an 8 bpp image.
pub fn gray_histogram(pix: &Pix) -> FilterResult<[u64; 256]> {
    check_8bpp(pix)?;
    let mut hist = [0u64; 256];
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            hist[pix.get_pixel_unchecked(x, y) as usize] += 1;
        }
    }
    Ok(hist)
}

/// Compute the Otsu threshold of an 8 bpp image.
///
/// Returns `t` maximizing the between-class variance of `{v <= t}` and
/// `{v > t}`. Foreground is then `v <= t`. A flat image yields its only
/// value.
pub fn compute_otsu_threshold(pix: &Pix) -> FilterResult<u8> {
    let hist = gray_histogram(pix)?;
    let total: u64 = hist.iter().sum();
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &n)| v as f64 * n as f64)
        .sum();

    let mut best_t = 0u8;
    let mut best_var = -1.0f64;
    let mut w0 = 0u64;
    let mut sum0 = 0.0f64;
    for (t, &n) in hist.iter().enumerate() {
        w0 += n;
        sum0 += t as f64 * n as f64;
        if w0 == 0 {
            continue;
        }
        let w1 = total - w0;
        if w1 == 0 {
            if best_var < 0.0 {
                best_t = t as u8;
            }
            break;
        }
        let m0 = sum0 / w0 as f64;
        let m1 = (sum_all - sum0) / w1 as f64;
        let var = w0 as f64 * w1 as f64 * (m0 - m1) * (m0 - m1);
        if var > best_var {
            best_var = var;
            best_t = t as u8;
        }
    }
    Ok(best_t)
}

/// Binarize with a fixed threshold: `v < threshold` becomes foreground.
pub fn threshold_to_binary(pix: &Pix, threshold: u8) -> FilterResult<Pix> {
    check_8bpp(pix)?;
    let (w, h) = (pix.width(), pix.height());
    let mut out = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
    out.set_resolution(pix.xres(), pix.yres());
    for y in 0..h {
        for x in 0..w {
            if pix.get_pixel_unchecked(x, y) < threshold as u32 {
                out.set_pixel_unchecked(x, y, 1);
            }
        }
    }
    Ok(out.into())
}

/// Binarize with the Otsu threshold.
pub fn threshold_otsu(pix: &Pix) -> FilterResult<Pix> {
    let t = compute_otsu_threshold(pix)?;
    threshold_to_binary(pix, t.saturating_add(1))
}

/// Binarize against the local mean of a `(2*half_window + 1)` window.
pub fn adaptive_threshold(pix: &Pix, half_window: u32, offset: f64) -> FilterResult<Pix> {
    check_8bpp(pix)?;
    if half_window == 0 {
        return Err(FilterError::InvalidParameters(
            "adaptive threshold window must be at least 3x3".to_string(),
        ));
    }
    let table = IntegralImage::new(pix)?;
    let (w, h) = (pix.width(), pix.height());
    let mut out = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
    out.set_resolution(pix.xres(), pix.yres());
    for y in 0..h {
        for x in 0..w {
            let mean = table.local_mean(x, y, half_window);
            if (pix.get_pixel_unchecked(x, y) as f64) < mean - offset {
                out.set_pixel_unchecked(x, y, 1);
            }
        }
    }
    Ok(out.into())
}

/// Binarize with the given method.
pub fn binarize(pix: &Pix, method: BinarizeMethod) -> FilterResult<Pix> {
    match method {
        BinarizeMethod::Otsu => threshold_otsu(pix),
        BinarizeMethod::Fixed { threshold } => threshold_to_binary(pix, threshold),
        BinarizeMethod::AdaptiveMean {
            half_window,
            offset,
        } => adaptive_threshold(pix, half_window, offset),
    }
}
