//! Rasterization of a [`PageDrawing`]

use crate::drawing::{PageDrawing, Shape};
use crate::error::{Error, Result};
use crate::font;
use crate::pix::{Pix, PixMut, PixelDepth};

/// Render a page drawing to an 8 bpp grayscale image at `dpi`.
///
/// The background is white. The image carries `dpi` as its resolution.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `dpi` is not positive, or
/// [`Error::InvalidDimension`] if the page rounds to zero pixels.
pub fn render_drawing(drawing: &PageDrawing, dpi: f64) -> Result<Pix> {
    if !(dpi > 0.0 && dpi.is_finite()) {
        return Err(Error::InvalidParameter(format!("dpi must be positive: {}", dpi)));
    }
    let s = dpi / 72.0;
    let w = (drawing.width_pt * s).round() as u32;
    let h = (drawing.height_pt * s).round() as u32;
    let mut pm = Pix::new_filled(w, h, PixelDepth::Bit8, 255)?.to_mut();
    pm.set_resolution(dpi.round() as i32, dpi.round() as i32);

    for shape in &drawing.shapes {
        paint_shape(&mut pm, shape, s);
    }
    Ok(pm.into())
}

fn paint_shape(pm: &mut PixMut, shape: &Shape, s: f64) {
    match shape {
        Shape::Rect { x, y, w, h, gray } => {
            pm.fill_rect(x * s, y * s, (x + w) * s, (y + h) * s, *gray as u32)
        }
        Shape::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            gray,
        } => pm.draw_line(
            x1 * s,
            y1 * s,
            x2 * s,
            y2 * s,
            (width * s / 2.0).max(0.5),
            *gray as u32,
        ),
        Shape::Circle {
            cx,
            cy,
            r,
            stroke,
            gray,
        } => pm.stroke_circle(
            cx * s,
            cy * s,
            r * s,
            (stroke * s / 2.0).max(0.5),
            *gray as u32,
        ),
        Shape::Disk { cx, cy, r, gray } => pm.fill_disk(cx * s, cy * s, r * s, *gray as u32),
        Shape::Text {
            x,
            y,
            size,
            text,
            gray,
        } => paint_text(pm, x * s, y * s, size * s, text, *gray as u32),
    }
}

/// Paint text with the bitmap font; `(x, baseline)` and `size` in pixels.
fn paint_text(pm: &mut PixMut, x: f64, baseline: f64, size: f64, text: &str, val: u32) {
    let cap = size * 0.7;
    let dot = cap / font::GLYPH_ROWS as f64;
    let top = baseline - cap;
    for (i, c) in text.chars().enumerate() {
        let gx = x + (i as u32 * font::ADVANCE) as f64 * dot;
        let rows = font::glyph(c);
        for (r, bits) in rows.iter().enumerate() {
            for col in 0..font::GLYPH_COLUMNS {
                if bits & (1 << (font::GLYPH_COLUMNS - 1 - col)) != 0 {
                    let x0 = gx + col as f64 * dot;
                    let y0 = top + r as f64 * dot;
                    pm.fill_rect(x0, y0, x0 + dot, y0 + dot, val);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::mm_to_pt;

    #[test]
    fn test_render_size_and_resolution() {
        let d = PageDrawing::new(mm_to_pt(210.0), mm_to_pt(297.0));
        let pix = render_drawing(&d, 100.0).unwrap();
        assert_eq!(pix.width(), 827);
        assert_eq!(pix.height(), 1169);
        assert_eq!(pix.xres(), 100);
        assert_eq!(pix.get_pixel(400, 600), Some(255));
    }

    #[test]
    fn test_render_square_and_text() {
        let mut d = PageDrawing::new(72.0, 72.0);
        d.centered_square(36.0, 36.0, 18.0, 0);
        d.text(2.0, 70.0, 10.0, "I", 0);
        let pix = render_drawing(&d, 72.0).unwrap();
        assert_eq!(pix.get_pixel(36, 36), Some(0));
        assert_eq!(pix.get_pixel(26, 26), Some(255));
        assert_eq!(pix.get_pixel(28, 28), Some(0));
        // Top bar of the glyph 'I' spans columns 1..4 of the first row.
        let dot = 7.0 / 7.0;
        let y = (70.0 - 7.0 + dot / 2.0) as u32;
        assert_eq!(pix.get_pixel(4, y), Some(0));
    }

    #[test]
    fn test_bad_dpi() {
        let d = PageDrawing::new(10.0, 10.0);
        assert!(render_drawing(&d, 0.0).is_err());
    }
}
