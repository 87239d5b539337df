//! Page geometry of a bubble sheet
//!
//! All lengths are millimetres on the printed page, origin at the top-left
//! corner, y growing downward. The calibration frame is the bounding box
//! of the four marker centers: it spans the bubble column horizontally and
//! the page's rows plus a margin vertically, so a partial last page gets a
//! shorter frame.

use crate::{SheetError, SheetResult};
use bubblemark_core::FrameBounds;
use serde::{Deserialize, Serialize};

/// Geometry parameters of a sheet page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub page_width: f64,
    pub page_height: f64,
    /// Students per page
    pub rows_per_page: usize,
    /// Vertical distance between row centers
    pub row_pitch: f64,
    /// Center of the first row
    pub first_row_y: f64,
    /// Left edge of page content; the band left of it holds only the barcode
    pub content_left: f64,
    /// Row rules and text end here
    pub content_right: f64,

    pub bubble_x: f64,
    pub bubble_radius: f64,
    pub bubble_stroke: f64,

    /// Marker centers: left and right frame edges
    pub frame_left: f64,
    pub frame_right: f64,
    /// Distance from the first/last row center to the top/bottom frame edge
    pub frame_margin_y: f64,
    pub marker_size: f64,

    pub timing_mark_x: f64,
    pub timing_mark_size: f64,

    /// Left edge of the vertical barcode
    pub barcode_x: f64,
    /// Bar length across the page
    pub barcode_width: f64,
    /// Narrow element size along the symbol
    pub barcode_module: f64,
    /// Wide element size in modules
    pub barcode_wide_ratio: f64,
    /// Top of the first bar
    pub barcode_top: f64,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            rows_per_page: 30,
            row_pitch: 7.0,
            first_row_y: 62.0,
            content_left: 18.0,
            content_right: 143.0,
            bubble_x: 170.0,
            bubble_radius: 2.5,
            bubble_stroke: 0.3,
            frame_left: 155.0,
            frame_right: 180.0,
            frame_margin_y: 9.0,
            marker_size: 6.0,
            timing_mark_x: 149.0,
            timing_mark_size: 3.0,
            barcode_x: 4.0,
            barcode_width: 8.0,
            barcode_module: 0.6,
            barcode_wide_ratio: 2.5,
            barcode_top: 110.0,
        }
    }
}

impl SheetLayout {
    /// Set the number of students per page
    pub fn with_rows_per_page(mut self, rows: usize) -> Self {
        self.rows_per_page = rows;
        self
    }

    /// Set the bubble radius
    pub fn with_bubble_radius(mut self, radius: f64) -> Self {
        self.bubble_radius = radius;
        self
    }

    /// Set the row pitch
    pub fn with_row_pitch(mut self, pitch: f64) -> Self {
        self.row_pitch = pitch;
        self
    }

    /// Number of pages needed for `students` rows
    pub fn page_count(&self, students: usize) -> usize {
        students.div_ceil(self.rows_per_page.max(1))
    }

    /// Center y of the 0-based row `index`
    pub fn row_y(&self, index: usize) -> f64 {
        self.first_row_y + index as f64 * self.row_pitch
    }

    /// Calibration frame of a page holding `rows` rows
    pub fn frame_mm(&self, rows: usize) -> SheetResult<FrameBounds> {
        let top = self.first_row_y - self.frame_margin_y;
        let bottom = self.row_y(rows.max(1) - 1) + self.frame_margin_y;
        Ok(FrameBounds::new(
            self.frame_left,
            top,
            self.frame_right - self.frame_left,
            bottom - top,
        )?)
    }

    /// Bubble radius as a fraction of the frame width
    pub fn radius_ratio(&self) -> f64 {
        self.bubble_radius / (self.frame_right - self.frame_left)
    }

    /// Check that a full page fits and that the marks do not overlap.
    pub fn validate(&self) -> SheetResult<()> {
        let fail = |msg: String| Err(SheetError::InvalidLayout(msg));
        let positive = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("row_pitch", self.row_pitch),
            ("bubble_radius", self.bubble_radius),
            ("marker_size", self.marker_size),
            ("timing_mark_size", self.timing_mark_size),
            ("barcode_module", self.barcode_module),
        ];
        for (name, v) in positive {
            if !(v > 0.0 && v.is_finite()) {
                return fail(format!("{} must be positive, got {}", name, v));
            }
        }
        if self.rows_per_page == 0 {
            return fail("rows_per_page must be at least 1".to_string());
        }
        if self.barcode_wide_ratio < 2.0 {
            return fail(format!(
                "barcode_wide_ratio must be at least 2, got {}",
                self.barcode_wide_ratio
            ));
        }
        if self.bubble_x - self.bubble_radius <= self.frame_left
            || self.bubble_x + self.bubble_radius >= self.frame_right
        {
            return fail("bubble column must lie inside the frame".to_string());
        }
        if 2.0 * self.bubble_radius >= self.row_pitch {
            return fail("bubbles of adjacent rows overlap".to_string());
        }
        let timing_right = self.timing_mark_x + self.timing_mark_size / 2.0;
        if timing_right >= self.frame_left - self.marker_size / 2.0 {
            return fail("timing marks overlap the calibration markers".to_string());
        }
        if self.content_right >= self.timing_mark_x - self.timing_mark_size / 2.0 {
            return fail("row content runs into the timing marks".to_string());
        }
        if self.barcode_x + self.barcode_width >= self.content_left {
            return fail("barcode runs into the page content".to_string());
        }
        let frame = self.frame_mm(self.rows_per_page)?;
        if frame.bottom() + self.marker_size / 2.0 >= self.page_height - 10.0 {
            return fail(format!(
                "{} rows do not fit above the footer",
                self.rows_per_page
            ));
        }
        if self.frame_right + self.marker_size / 2.0 >= self.page_width {
            return fail("markers run off the right edge".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = SheetLayout::default();
        layout.validate().unwrap();
        assert_eq!(layout.page_count(61), 3);
        assert_eq!(layout.page_count(30), 1);
        assert!((layout.radius_ratio() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_frame_shrinks_on_partial_page() {
        let layout = SheetLayout::default();
        let full = layout.frame_mm(30).unwrap();
        let one = layout.frame_mm(1).unwrap();
        assert!((full.bottom() - 274.0).abs() < 1e-9);
        assert!((one.height - 18.0).abs() < 1e-9);
        assert_eq!(one.top, full.top);
    }

    #[test]
    fn test_too_many_rows_rejected() {
        let layout = SheetLayout::default().with_rows_per_page(40);
        assert!(matches!(layout.validate(), Err(SheetError::InvalidLayout(_))));
        let layout = SheetLayout::default().with_bubble_radius(4.0);
        assert!(layout.validate().is_err());
    }
}
