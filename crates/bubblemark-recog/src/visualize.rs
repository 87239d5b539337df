//! Annotated page overlays
//!
//! Draws detection outcomes on a color copy of the aligned page: a green
//! ring around filled bubbles, a red ring around empty ones and a yellow
//! box around each calibration corner.

use crate::align::AlignedPage;
use crate::detect::BubbleDetectionResult;
use crate::RecogResult;
use bubblemark_core::color::compose_rgb;
use bubblemark_core::pix::convert::convert_to_rgb;
use bubblemark_core::{Pix, PixelDepth};

/// Ring color for filled bubbles
pub const FILLED_COLOR: (u8, u8, u8) = (0, 200, 0);
/// Ring color for empty bubbles
pub const EMPTY_COLOR: (u8, u8, u8) = (220, 0, 0);
/// Box color for calibration corners
pub const CORNER_COLOR: (u8, u8, u8) = (255, 210, 0);

/// Render the detection overlay for one page.
///
/// `radius` is the bubble radius in aligned-image pixels. Results without a
/// center are skipped.
pub fn render_overlay(
    page: &AlignedPage,
    results: &[BubbleDetectionResult],
    radius: f64,
) -> RecogResult<Pix> {
    let rgb = match page.image.depth() {
        PixelDepth::Bit32 => page.image.clone(),
        _ => convert_to_rgb(&page.image)?,
    };
    let mut pm = rgb.to_mut();
    let stroke = (radius * 0.12).max(1.0);

    for r in results {
        let Some(c) = r.bubble_center else {
            continue;
        };
        let (red, green, blue) = if r.is_filled {
            FILLED_COLOR
        } else {
            EMPTY_COLOR
        };
        pm.stroke_circle(c.x, c.y, radius * 1.3, stroke, compose_rgb(red, green, blue));
    }

    let half = page.frame.width * 0.15;
    let corner = compose_rgb(CORNER_COLOR.0, CORNER_COLOR.1, CORNER_COLOR.2);
    for p in page.frame.corners() {
        pm.draw_rect_outline(p.x - half, p.y - half, p.x + half, p.y + half, stroke, corner);
    }
    Ok(pm.into())
}
