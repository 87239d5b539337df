//! Stored bubble positions

use bubblemark_core::NormalizedPoint;
use bubblemark_recog::ExpectedBubble;
use serde::{Deserialize, Serialize};

/// One student's bubble on one generated page.
///
/// `bubble_x`, `bubble_y` and `bubble_radius` are PostScript points from
/// the top-left page corner. The ratios locate the bubble center inside
/// the calibration frame and are what detection uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleTemplate {
    pub lecture_id: String,
    pub page_number: u32,
    pub student_id: String,
    pub student_name: String,
    /// 1-based row on the page
    pub row_number: u32,
    pub bubble_x: f64,
    pub bubble_y: f64,
    pub bubble_radius: f64,
    pub bubble_x_ratio: Option<f64>,
    pub bubble_y_ratio: Option<f64>,
    /// Radius as a fraction of the frame width
    #[serde(default)]
    pub bubble_radius_ratio: Option<f64>,
}

impl BubbleTemplate {
    /// Stored frame position, if both ratios are present and valid
    pub fn normalized(&self) -> Option<NormalizedPoint> {
        match (self.bubble_x_ratio, self.bubble_y_ratio) {
            (Some(x), Some(y)) => NormalizedPoint::new(x, y).ok(),
            _ => None,
        }
    }

    /// What the detector needs to know about this row
    pub fn expectation(&self) -> ExpectedBubble {
        ExpectedBubble {
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
            row_number: self.row_number,
            position: self.normalized(),
            radius_ratio: self.bubble_radius_ratio,
        }
    }
}

/// A student on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
}

impl Student {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
        }
    }
}
