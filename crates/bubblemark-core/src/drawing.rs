//! Resolution independent page description
//!
//! A [`PageDrawing`] lists the shapes of one printed page in PostScript
//! points (1/72 inch), origin at the top-left corner, y growing downward.
//! The same drawing feeds the PDF writer and [`crate::render_drawing`], so
//! the printed sheet and its synthetic raster never disagree.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Convert millimetres to points.
#[inline]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Convert points to millimetres.
#[inline]
pub fn pt_to_mm(pt: f64) -> f64 {
    pt / PT_PER_MM
}

/// Gray level, 0 = black, 255 = white.
pub type Gray = u8;

/// One drawable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Filled rectangle with top-left corner `(x, y)`.
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        gray: Gray,
    },
    /// Straight stroke.
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        gray: Gray,
    },
    /// Circle outline.
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        stroke: f64,
        gray: Gray,
    },
    /// Filled circle.
    Disk { cx: f64, cy: f64, r: f64, gray: Gray },
    /// Single line of text; `y` is the baseline, `size` the font size.
    Text {
        x: f64,
        y: f64,
        size: f64,
        text: String,
        gray: Gray,
    },
}

/// All shapes of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDrawing {
    pub width_pt: f64,
    pub height_pt: f64,
    pub shapes: Vec<Shape>,
}

impl PageDrawing {
    /// Create an empty page of the given size in points.
    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
            shapes: Vec::new(),
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Append a filled rectangle.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, gray: Gray) {
        self.push(Shape::Rect { x, y, w, h, gray });
    }

    /// Append a filled square centered at `(cx, cy)`.
    pub fn centered_square(&mut self, cx: f64, cy: f64, side: f64, gray: Gray) {
        self.rect(cx - side / 2.0, cy - side / 2.0, side, side, gray);
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64, gray: Gray) {
        self.push(Shape::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            gray,
        });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, stroke: f64, gray: Gray) {
        self.push(Shape::Circle {
            cx,
            cy,
            r,
            stroke,
            gray,
        });
    }

    pub fn disk(&mut self, cx: f64, cy: f64, r: f64, gray: Gray) {
        self.push(Shape::Disk { cx, cy, r, gray });
    }

    pub fn text(&mut self, x: f64, y: f64, size: f64, text: impl Into<String>, gray: Gray) {
        self.push(Shape::Text {
            x,
            y,
            size,
            text: text.into(),
            gray,
        });
    }

    /// Approximate advance width of `text` at `size` points.
    ///
    /// Both the bitmap font and Helvetica stay under 0.6 em per glyph for
    /// the characters used on a sheet.
    pub fn text_width(text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * 0.6
    }

    /// Truncate `text` so it fits in `max_width` points, marking the cut with "..".
    pub fn fit_text(text: &str, size: f64, max_width: f64) -> String {
        if Self::text_width(text, size) <= max_width {
            return text.to_string();
        }
        let per_char = size * 0.6;
        let keep = ((max_width / per_char).floor() as usize).saturating_sub(2);
        let mut out: String = text.chars().take(keep).collect();
        out.push_str("..");
        out
    }
}
