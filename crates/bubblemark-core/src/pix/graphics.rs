//! Drawing primitives
//!
//! Antialiasing-free painting of rectangles, disks, rings and line segments
//! in pixel coordinates. A pixel is painted when its center `(x + 0.5,
//! y + 0.5)` lies inside the shape, so rendering is exact and repeatable.

use super::PixMut;

impl PixMut {
    /// Fill the axis-aligned rectangle `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, val: u32) {
        let (xa, xb) = span(x0.min(x1), x0.max(x1), self.width());
        let (ya, yb) = span(y0.min(y1), y0.max(y1), self.height());
        for y in ya..yb {
            for x in xa..xb {
                self.set_pixel_unchecked(x, y, val);
            }
        }
    }

    /// Outline a rectangle with lines of the given half width.
    pub fn draw_rect_outline(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        half_width: f64,
        val: u32,
    ) {
        self.fill_rect(x0 - half_width, y0 - half_width, x1 + half_width, y0 + half_width, val);
        self.fill_rect(x0 - half_width, y1 - half_width, x1 + half_width, y1 + half_width, val);
        self.fill_rect(x0 - half_width, y0 - half_width, x0 + half_width, y1 + half_width, val);
        self.fill_rect(x1 - half_width, y0 - half_width, x1 + half_width, y1 + half_width, val);
    }

    /// Fill the disk of radius `r` centered at `(cx, cy)`.
    pub fn fill_disk(&mut self, cx: f64, cy: f64, r: f64, val: u32) {
        self.paint_where(cx - r, cy - r, cx + r, cy + r, val, |px, py| {
            let (dx, dy) = (px - cx, py - cy);
            dx * dx + dy * dy <= r * r
        });
    }

    /// Paint the ring `|d - r| <= half_width` around `(cx, cy)`.
    pub fn stroke_circle(&mut self, cx: f64, cy: f64, r: f64, half_width: f64, val: u32) {
        let outer = r + half_width;
        let inner = (r - half_width).max(0.0);
        self.paint_where(cx - outer, cy - outer, cx + outer, cy + outer, val, |px, py| {
            let (dx, dy) = (px - cx, py - cy);
            let d2 = dx * dx + dy * dy;
            d2 <= outer * outer && d2 >= inner * inner
        });
    }

    /// Paint every pixel within `half_width` of the segment `(x1, y1)-(x2, y2)`.
    pub fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, half_width: f64, val: u32) {
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len2 = dx * dx + dy * dy;
        self.paint_where(
            x1.min(x2) - half_width,
            y1.min(y2) - half_width,
            x1.max(x2) + half_width,
            y1.max(y2) + half_width,
            val,
            |px, py| {
                let t = if len2 > 0.0 {
                    (((px - x1) * dx + (py - y1) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (qx, qy) = (x1 + t * dx - px, y1 + t * dy - py);
                qx * qx + qy * qy <= half_width * half_width
            },
        );
    }

    fn paint_where<F>(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, val: u32, inside: F)
    where
        F: Fn(f64, f64) -> bool,
    {
        let (xa, xb) = span(x0.floor(), x1.ceil() + 1.0, self.width());
        let (ya, yb) = span(y0.floor(), y1.ceil() + 1.0, self.height());
        for y in ya..yb {
            for x in xa..xb {
                if inside(x as f64 + 0.5, y as f64 + 0.5) {
                    self.set_pixel_unchecked(x, y, val);
                }
            }
        }
    }
}

/// Pixel index range whose centers fall in `[lo, hi)`, clipped to `[0, limit)`.
fn span(lo: f64, hi: f64, limit: u32) -> (u32, u32) {
    let a = (lo - 0.5).ceil().max(0.0);
    let b = (hi - 0.5).ceil().max(0.0);
    let a = (a as u64).min(limit as u64) as u32;
    let b = (b as u64).min(limit as u64) as u32;
    (a, b.max(a))
}

#[cfg(test)]
mod tests {
    use crate::{Pix, PixelDepth};

    fn count(pix: &Pix, val: u32) -> usize {
        let mut n = 0;
        for y in 0..pix.height() {
            for x in 0..pix.width() {
                if pix.get_pixel_unchecked(x, y) == val {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_fill_rect_exact() {
        let mut pm = Pix::new_filled(20, 20, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.fill_rect(2.0, 3.0, 7.0, 5.0, 0);
        assert_eq!(count(&pm.into(), 0), 10);
    }

    #[test]
    fn test_disk_area_close_to_pi_r2() {
        let mut pm = Pix::new_filled(100, 100, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.fill_disk(50.0, 50.0, 20.0, 0);
        let n = count(&pm.into(), 0) as f64;
        let expected = std::f64::consts::PI * 400.0;
        assert!((n - expected).abs() / expected < 0.02);
    }

    #[test]
    fn test_ring_is_hollow() {
        let mut pm = Pix::new_filled(60, 60, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.stroke_circle(30.0, 30.0, 20.0, 1.0, 0);
        let pix: Pix = pm.into();
        assert_eq!(pix.get_pixel(30, 30), Some(255));
        assert_eq!(pix.get_pixel(30, 10), Some(0));
    }
}
