//! Calibration marker detection
//!
//! Every sheet carries four solid square markers around the bubble column.
//! Their centers define the calibration frame that bubble ratios are
//! measured against. Detection runs on a smoothed, binarized copy of the
//! page and keeps only dark components that look like markers: roughly
//! square, solid, of the expected size, and in the half of the page that
//! holds the bubble column.

use crate::{RecogError, RecogResult};
use bubblemark_core::pix::convert::convert_to_gray;
use bubblemark_core::{FrameBounds, Pix, PixelDepth, Point};
use bubblemark_filter::{BinarizeMethod, binarize, box_blur};
use bubblemark_region::{ComponentFilter, ConnectedComponent, ConnectivityType};
use bubblemark_transform::check_quad;
use serde::{Deserialize, Serialize};

/// Options for calibration marker detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Half size of the smoothing box filter in pixels (0 disables)
    pub blur_half_width: u32,
    /// Binarization of the smoothed page
    pub binarize: BinarizeMethod,
    /// Printed marker side in millimeters
    pub marker_size_mm: f64,
    /// Printed page width in millimeters, used to convert the marker size
    pub page_width_mm: f64,
    /// Accepted marker side as a multiple of the expected side
    pub min_size_factor: f64,
    /// Upper bound of accepted marker side as a multiple of the expected side
    pub max_size_factor: f64,
    /// Longest over shortest bounding box side
    pub max_aspect: f64,
    /// Minimum fraction of the bounding box covered by the marker
    pub min_fill_ratio: f64,
    /// Markers lie right of this fraction of the page width
    pub band_start: f64,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            blur_half_width: 1,
            binarize: BinarizeMethod::Otsu,
            marker_size_mm: 6.0,
            page_width_mm: 210.0,
            min_size_factor: 0.65,
            max_size_factor: 1.5,
            max_aspect: 1.4,
            min_fill_ratio: 0.85,
            band_start: 0.55,
        }
    }
}

impl CalibrationOptions {
    /// Set the binarization method
    pub fn with_binarize(mut self, method: BinarizeMethod) -> Self {
        self.binarize = method;
        self
    }

    /// Set the printed marker size
    pub fn with_marker_size_mm(mut self, mm: f64) -> Self {
        self.marker_size_mm = mm;
        self
    }

    /// Set the marker band start fraction
    pub fn with_band_start(mut self, fraction: f64) -> Self {
        self.band_start = fraction;
        self
    }

    /// Expected marker side in pixels for an image of the given width
    pub fn expected_marker_px(&self, image_width: u32) -> f64 {
        self.marker_size_mm / self.page_width_mm * image_width as f64
    }
}

/// The four marker centers found on a page, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFrame {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl CalibrationFrame {
    /// Corners as `[top_left, top_right, bottom_left, bottom_right]`
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Axis-aligned bounding box of the four centers
    pub fn bounds(&self) -> RecogResult<FrameBounds> {
        Ok(FrameBounds::enclosing(&self.corners())?)
    }

    /// Mean of the top and bottom edge lengths
    pub fn mean_width(&self) -> f64 {
        (self.top_left.distance(&self.top_right) + self.bottom_left.distance(&self.bottom_right))
            / 2.0
    }

    /// Mean of the left and right edge lengths
    pub fn mean_height(&self) -> f64 {
        (self.top_left.distance(&self.bottom_left) + self.top_right.distance(&self.bottom_right))
            / 2.0
    }
}

/// Smooth, binarize and label a page, returning its dark components.
pub(crate) fn dark_components(
    gray: &Pix,
    blur_half_width: u32,
    method: BinarizeMethod,
) -> RecogResult<Vec<ConnectedComponent>> {
    let smoothed = box_blur(gray, blur_half_width)?;
    let binary = binarize(&smoothed, method)?;
    Ok(bubblemark_region::find_connected_components(
        &binary,
        ConnectivityType::EightWay,
    )?)
}

pub(crate) fn to_gray(pix: &Pix) -> RecogResult<Pix> {
    Ok(match pix.depth() {
        PixelDepth::Bit8 => pix.clone(),
        _ => convert_to_gray(pix)?,
    })
}

/// Find the components that qualify as calibration markers.
pub fn find_marker_candidates(
    pix: &Pix,
    options: &CalibrationOptions,
) -> RecogResult<Vec<ConnectedComponent>> {
    let gray = to_gray(pix)?;
    let expected = options.expected_marker_px(gray.width());
    let components = dark_components(&gray, options.blur_half_width, options.binarize)?;
    let filter = ComponentFilter::new()
        .side_range(
            expected * options.min_size_factor,
            expected * options.max_size_factor,
        )
        .max_aspect(options.max_aspect)
        .min_fill(options.min_fill_ratio);
    let band_x = options.band_start * gray.width() as f64;
    let candidates: Vec<ConnectedComponent> = filter
        .apply(&components)
        .into_iter()
        .filter(|c| c.centroid_x >= band_x)
        .collect();
    tracing::debug!(
        components = components.len(),
        candidates = candidates.len(),
        expected_px = expected,
        "marker candidates"
    );
    Ok(candidates)
}

/// Locate the calibration frame of a page.
///
/// Corners are assigned from the extremes of `x + y` (top-left and
/// bottom-right) and `x - y` (top-right and bottom-left) over the marker
/// candidates.
///
/// # Errors
///
/// - [`RecogError::CalibrationNotFound`] if fewer than four candidates
///   survive filtering or the extremes do not pick four distinct markers.
/// - [`RecogError::DegenerateFrame`] if the four centers are nearly
///   collinear or do not form a convex quadrilateral.
pub fn find_calibration_frame(
    pix: &Pix,
    options: &CalibrationOptions,
) -> RecogResult<CalibrationFrame> {
    let candidates = find_marker_candidates(pix, options)?;
    if candidates.len() < 4 {
        return Err(RecogError::CalibrationNotFound(format!(
            "found {} marker candidates, need 4",
            candidates.len()
        )));
    }
    frame_from_centers(
        &candidates
            .iter()
            .map(|c| Point::new(c.centroid_x, c.centroid_y))
            .collect::<Vec<_>>(),
    )
}

/// Assign four corners from a set of marker centers and validate them.
pub fn frame_from_centers(centers: &[Point]) -> RecogResult<CalibrationFrame> {
    if centers.len() < 4 {
        return Err(RecogError::CalibrationNotFound(format!(
            "found {} marker centers, need 4",
            centers.len()
        )));
    }
    let pick = |key: &dyn Fn(&Point) -> f64, largest: bool| -> usize {
        let mut best = 0;
        for (i, p) in centers.iter().enumerate() {
            let (k, kb) = (key(p), key(&centers[best]));
            if (largest && k > kb) || (!largest && k < kb) {
                best = i;
            }
        }
        best
    };
    let tl = pick(&|p| p.x + p.y, false);
    let br = pick(&|p| p.x + p.y, true);
    let tr = pick(&|p| p.x - p.y, true);
    let bl = pick(&|p| p.x - p.y, false);

    let mut ids = [tl, tr, bl, br];
    ids.sort_unstable();
    if ids.windows(2).any(|w| w[0] == w[1]) {
        return Err(RecogError::CalibrationNotFound(
            "marker extremes do not select four distinct corners".to_string(),
        ));
    }

    let frame = CalibrationFrame {
        top_left: centers[tl],
        top_right: centers[tr],
        bottom_left: centers[bl],
        bottom_right: centers[br],
    };
    check_quad(&frame.corners()).map_err(|e| RecogError::DegenerateFrame(e.to_string()))?;
    Ok(frame)
}
