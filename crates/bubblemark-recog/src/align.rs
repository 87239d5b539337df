//! Perspective alignment into canonical frame coordinates

use crate::calibration::{CalibrationFrame, CalibrationOptions, find_calibration_frame};
use crate::{RecogError, RecogResult};
use bubblemark_core::{FrameBounds, Pix};
use bubblemark_transform::{Homography, ProjectiveFill, warp_perspective};
use serde::{Deserialize, Serialize};

/// Options for page alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    /// Margin kept around the frame, as a fraction of the frame width
    pub padding_ratio: f64,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self { padding_ratio: 0.4 }
    }
}

/// A page warped so its calibration frame is an axis-aligned rectangle
#[derive(Debug, Clone)]
pub struct AlignedPage {
    /// The warped page
    pub image: Pix,
    /// Frame rectangle in `image` coordinates
    pub frame: FrameBounds,
    /// Marker centers found on the original page
    pub calibration: CalibrationFrame,
    /// Mapping from original page to `image` coordinates
    pub homography: Homography,
}

/// Warp a page so its calibration frame becomes a `W x H` rectangle.
///
/// `W` and `H` are the mean opposing edge lengths of the detected frame,
/// so the canonical image keeps roughly the scan's own resolution. The
/// frame is placed `padding_ratio * W` in from the top-left corner with
/// the same margin on every side.
pub fn align_to_frame(
    pix: &Pix,
    calibration: &CalibrationFrame,
    options: &AlignOptions,
) -> RecogResult<AlignedPage> {
    let (w, h) = (calibration.mean_width(), calibration.mean_height());
    if w < 1.0 || h < 1.0 {
        return Err(RecogError::DegenerateFrame(format!(
            "frame too small to align: {:.1} x {:.1}",
            w, h
        )));
    }
    let pad = options.padding_ratio.max(0.0) * w;
    let frame = FrameBounds::new(pad, pad, w, h)?;
    let target = frame.corners();

    let homography = Homography::from_quad(&calibration.corners(), &target)
        .map_err(|e| RecogError::DegenerateFrame(e.to_string()))?;
    let out_w = (w + 2.0 * pad).ceil() as u32;
    let out_h = (h + 2.0 * pad).ceil() as u32;
    let image = warp_perspective(pix, &homography, out_w, out_h, ProjectiveFill::White)?;
    tracing::debug!(width = out_w, height = out_h, "page aligned");

    Ok(AlignedPage {
        image,
        frame,
        calibration: *calibration,
        homography,
    })
}

/// Detect the calibration frame and align the page to it.
pub fn align_page(
    pix: &Pix,
    calibration_options: &CalibrationOptions,
    options: &AlignOptions,
) -> RecogResult<AlignedPage> {
    let gray = crate::calibration::to_gray(pix)?;
    let calibration = find_calibration_frame(&gray, calibration_options)?;
    align_to_frame(&gray, &calibration, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblemark_core::{PixelDepth, Point};

    #[test]
    fn test_skewed_frame_becomes_rectangle() {
        let calibration = CalibrationFrame {
            top_left: Point::new(102.0, 50.0),
            top_right: Point::new(152.0, 53.0),
            bottom_left: Point::new(96.0, 250.0),
            bottom_right: Point::new(147.0, 252.0),
        };
        let pix = Pix::new_filled(200, 300, PixelDepth::Bit8, 255).unwrap();
        let aligned = align_to_frame(&pix, &calibration, &AlignOptions::default()).unwrap();
        let f = aligned.frame;
        assert!((f.left - f.width * 0.4).abs() < 1e-9);
        for (src, dst) in calibration.corners().iter().zip(f.corners().iter()) {
            let p = aligned.homography.project(*src);
            assert!((p.x - dst.x).abs() < 1e-6 && (p.y - dst.y).abs() < 1e-6);
        }
    }
}
