//! Coordinate systems of a bubble sheet
//!
//! A bubble position exists in two forms. At generation time it is an
//! absolute [`Point`] on the page. Everywhere it must survive a print and
//! scan round trip it is a [`NormalizedPoint`], a pair of ratios inside the
//! calibration frame. [`NormalizedPoint::to_pixels`] is the only place where
//! ratios become pixels, and [`NormalizedPoint::from_absolute`] the only
//! place where absolute positions become ratios.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A point in some absolute coordinate space (points or pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounds of the calibration frame, origin top-left, y down.
///
/// The frame is the bounding box of the four calibration marker centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl FrameBounds {
    /// Create frame bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless both extents are positive
    /// and finite.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Result<Self> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "frame extents must be positive: {}x{}",
                width, height
            )));
        }
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }

    /// Bounding box of a set of points.
    pub fn enclosing(points: &[Point]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidParameter("no points to enclose".into()));
        }
        let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Corner points in top-left, top-right, bottom-left, bottom-right order.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right(), self.top),
            Point::new(self.left, self.bottom()),
            Point::new(self.right(), self.bottom()),
        ]
    }
}

/// Position expressed as ratios of the calibration frame's extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x_ratio: f64,
    pub y_ratio: f64,
}

impl NormalizedPoint {
    /// Create a normalized point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if either ratio is outside `[0, 1]`.
    pub fn new(x_ratio: f64, y_ratio: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&x_ratio) || !(0.0..=1.0).contains(&y_ratio) {
            return Err(Error::InvalidParameter(format!(
                "ratios must lie in [0, 1]: ({}, {})",
                x_ratio, y_ratio
            )));
        }
        Ok(Self { x_ratio, y_ratio })
    }

    /// Express an absolute point relative to `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the point lies outside the frame.
    pub fn from_absolute(point: Point, frame: &FrameBounds) -> Result<Self> {
        Self::new(
            (point.x - frame.left) / frame.width,
            (point.y - frame.top) / frame.height,
        )
    }

    /// Reconstruct the absolute position inside `frame`.
    pub fn to_pixels(&self, frame: &FrameBounds) -> Point {
        Point::new(
            frame.left + self.x_ratio * frame.width,
            frame.top + self.y_ratio * frame.height,
        )
    }
}
