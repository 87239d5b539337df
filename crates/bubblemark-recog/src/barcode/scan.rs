//! Locating and reading the page identifier barcode
//!
//! The identifier is printed as a vertical Interleaved 2 of 5 symbol in
//! the left margin, so it is read along image columns. Pages fed upside
//! down carry it in the right margin and pages fed sideways carry it along
//! the top or bottom edge; those bands are tried in turn.

use super::itf::{decode_bar_string, symbol_len};
use super::signal::{dark_runs, quantize_widths, split_on_gaps};
use crate::{RecogError, RecogResult};
use bubblemark_core::pix::convert::convert_to_gray;
use bubblemark_core::{Pix, PixelDepth};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options for barcode scanning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeScanOptions {
    /// Width of each edge band as a fraction of the page dimension
    pub band_fraction: f64,
    /// Gray level below which a pixel is part of a bar
    pub dark_threshold: u8,
    /// Distance between scan lines in pixels
    pub line_step: u32,
    /// Number of digits a valid payload carries
    pub expected_digits: usize,
    /// Light gap separating symbols, as a fraction of the scan line length
    pub min_gap_fraction: f64,
}

impl Default for BarcodeScanOptions {
    fn default() -> Self {
        Self {
            band_fraction: 0.08,
            dark_threshold: 128,
            line_step: 2,
            expected_digits: 12,
            min_gap_fraction: 0.012,
        }
    }
}

impl BarcodeScanOptions {
    /// Set the expected payload length
    pub fn with_expected_digits(mut self, digits: usize) -> Self {
        self.expected_digits = digits;
        self
    }

    /// Set the edge band width fraction
    pub fn with_band_fraction(mut self, fraction: f64) -> Self {
        self.band_fraction = fraction;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Left,
    Right,
    Top,
    Bottom,
}

/// Read the page identifier barcode.
///
/// Returns the decoded digit string. Within a band every scan line votes;
/// the most frequent payload wins, ties going to the first seen.
///
/// # Errors
///
/// Returns [`RecogError::Barcode`] when no band yields a payload of the
/// expected length.
pub fn read_page_barcode(pix: &Pix, options: &BarcodeScanOptions) -> RecogResult<String> {
    let gray = match pix.depth() {
        PixelDepth::Bit8 => pix.clone(),
        _ => convert_to_gray(pix)?,
    };
    for band in [Band::Left, Band::Right, Band::Top, Band::Bottom] {
        if let Some(payload) = scan_band(&gray, band, options) {
            tracing::debug!(?band, %payload, "barcode decoded");
            return Ok(payload);
        }
    }
    Err(RecogError::Barcode(
        "no Interleaved 2 of 5 symbol found in any page margin".to_string(),
    ))
}

fn scan_band(gray: &Pix, band: Band, options: &BarcodeScanOptions) -> Option<String> {
    let (w, h) = (gray.width(), gray.height());
    let vertical = matches!(band, Band::Left | Band::Right);
    let across = if vertical { w } else { h };
    let band_px = ((across as f64 * options.band_fraction).ceil() as u32).clamp(1, across);
    let first = match band {
        Band::Left | Band::Top => 0,
        Band::Right | Band::Bottom => across - band_px,
    };
    let line_len = if vertical { h } else { w };
    let min_gap = ((line_len as f64 * options.min_gap_fraction).round() as u32).max(2);
    let wanted = symbol_len(options.expected_digits);

    let mut votes: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0;
    let step = options.line_step.max(1);
    let mut line = Vec::with_capacity(line_len as usize);
    for pos in (first..first + band_px).step_by(step as usize) {
        line.clear();
        if vertical {
            line.extend((0..h).map(|y| gray.get_pixel_unchecked(pos, y) as u8));
        } else {
            line.extend((0..w).map(|x| gray.get_pixel_unchecked(x, pos) as u8));
        }
        let runs = dark_runs(&line, options.dark_threshold);
        for candidate in split_on_gaps(&runs, min_gap) {
            if candidate.len() != wanted {
                continue;
            }
            let Some(bars) = quantize_widths(candidate) else {
                continue;
            };
            if let Ok(payload) = decode_bar_string(&bars) {
                let entry = votes.entry(payload).or_insert((0, order));
                entry.0 += 1;
                order += 1;
            }
        }
    }

    votes
        .into_iter()
        .max_by(|(_, (na, oa)), (_, (nb, ob))| na.cmp(nb).then(ob.cmp(oa)))
        .map(|(payload, _)| payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::itf::encode_bar_string;

    /// Paint a vertical symbol at columns `[x0, x1)` starting at row `y0`.
    fn paint_vertical(pix: &mut bubblemark_core::PixMut, digits: &str, x0: f64, x1: f64, y0: f64) {
        let bars = encode_bar_string(digits).unwrap();
        let mut y = y0;
        for (i, c) in bars.chars().enumerate() {
            let len = if c == '1' { 4.0 } else { 10.0 };
            if i % 2 == 0 {
                pix.fill_rect(x0, y, x1, y + len, 0);
            }
            y += len;
        }
    }

    fn short_page_options() -> BarcodeScanOptions {
        // wide spaces are 10 px on a 600 px line
        BarcodeScanOptions {
            min_gap_fraction: 0.03,
            ..Default::default()
        }
    }

    #[test]
    fn test_reads_left_margin() {
        let mut pm = Pix::new_filled(300, 600, PixelDepth::Bit8, 255).unwrap().to_mut();
        paint_vertical(&mut pm, "123456789012", 6.0, 20.0, 100.0);
        let payload = read_page_barcode(&pm.into(), &short_page_options()).unwrap();
        assert_eq!(payload, "123456789012");
    }

    #[test]
    fn test_reads_upside_down_in_right_margin() {
        let mut pm = Pix::new_filled(300, 600, PixelDepth::Bit8, 255).unwrap().to_mut();
        paint_vertical(&mut pm, "000102030405", 280.0, 294.0, 100.0);
        // flip vertically: read bottom to top
        let src: Pix = pm.into();
        let mut flipped = src.create_template().to_mut();
        for y in 0..600 {
            for x in 0..300 {
                flipped.set_pixel_unchecked(x, 599 - y, src.get_pixel_unchecked(x, y));
            }
        }
        let payload = read_page_barcode(&flipped.into(), &short_page_options()).unwrap();
        assert_eq!(payload, "000102030405");
    }

    #[test]
    fn test_blank_page_fails() {
        let pix = Pix::new_filled(100, 100, PixelDepth::Bit8, 255).unwrap();
        assert!(matches!(
            read_page_barcode(&pix, &BarcodeScanOptions::default()),
            Err(RecogError::Barcode(_))
        ));
    }
}
