//! Box - Integer rectangle regions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Box {
    /// Left x coordinate
    pub x: i32,
    /// Top y coordinate
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl Box {
    /// Create a new box
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if width or height is negative.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Result<Self> {
        if w < 0 || h < 0 {
            return Err(Error::InvalidParameter(format!(
                "box dimensions must be non-negative: w={}, h={}",
                w, h
            )));
        }
        Ok(Self { x, y, w, h })
    }

    /// Create a box spanning two inclusive corner coordinates.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (l, r) = (x0.min(x1), x0.max(x1));
        let (t, b) = (y0.min(y1), y0.max(y1));
        Self {
            x: l,
            y: t,
            w: r - l + 1,
            h: b - t + 1,
        }
    }

    /// Get the right x coordinate (exclusive)
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Get the bottom y coordinate (exclusive)
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Get the exact center
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }

    /// Get the area
    #[inline]
    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Ratio of the longer side to the shorter side (>= 1.0)
    pub fn aspect(&self) -> f64 {
        let (a, b) = (self.w.max(1) as f64, self.h.max(1) as f64);
        a.max(b) / a.min(b)
    }

    /// Check whether the box touches the border of a `width x height` image.
    pub fn touches_border(&self, width: u32, height: u32) -> bool {
        self.x <= 0 || self.y <= 0 || self.right() >= width as i32 || self.bottom() >= height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_is_inclusive() {
        let b = Box::from_corners(5, 7, 2, 3);
        assert_eq!(b, Box::new(2, 3, 4, 5).unwrap());
        assert_eq!(b.right(), 6);
        assert_eq!(b.center(), (4.0, 5.5));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(Box::new(0, 0, -1, 4).is_err());
    }
}
