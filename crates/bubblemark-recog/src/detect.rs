//! Bubble fill detection
//!
//! Two detectors share the [`BubbleDetector`] trait:
//!
//! - [`TemplateDetector`] reconstructs each bubble from its stored frame
//!   ratios.
//! - [`DynamicDetector`] finds circular marks inside the calibration frame
//!   and pairs them with students by row order.
//!
//! Both classify a bubble by the fraction of dark pixels under a circular
//! mask. Every expected student gets exactly one result.

use crate::align::AlignedPage;
use crate::calibration::{dark_components, to_gray};
use crate::RecogResult;
use bubblemark_core::{FrameBounds, NormalizedPoint, Pix, Point};
use bubblemark_filter::BinarizeMethod;
use bubblemark_region::{ComponentFilter, ConnectedComponent};
use serde::{Deserialize, Serialize};

/// What the detector knows about one student row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedBubble {
    pub student_id: String,
    pub student_name: String,
    /// 1-based row on the page
    pub row_number: u32,
    /// Stored position relative to the calibration frame
    pub position: Option<NormalizedPoint>,
    /// Stored radius as a fraction of the frame width
    pub radius_ratio: Option<f64>,
}

/// Outcome for one student row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleDetectionResult {
    pub student_id: String,
    pub student_name: String,
    pub is_filled: bool,
    /// Fraction of mask pixels darker than the dark threshold, in `[0, 1]`
    pub fill_percentage: f64,
    /// Normalized distance of the fill fraction from the threshold
    pub confidence: f64,
    /// Center on the aligned image; `None` if no bubble was matched
    pub bubble_center: Option<Point>,
}

impl BubbleDetectionResult {
    /// Result for a student whose bubble could not be located
    pub fn unmatched(expected: &ExpectedBubble) -> Self {
        Self {
            student_id: expected.student_id.clone(),
            student_name: expected.student_name.clone(),
            is_filled: false,
            fill_percentage: 0.0,
            confidence: 0.0,
            bubble_center: None,
        }
    }
}

/// Options for bubble detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOptions {
    /// Fill fraction at or above which a bubble is filled
    pub fill_threshold: f64,
    /// Gray level below which a pixel counts as ink
    pub dark_threshold: u8,
    /// Bubble radius as a fraction of frame width when none is stored
    pub default_radius_ratio: f64,
    /// Move bubble centers onto the nearest timing mark row
    pub snap_to_timing_marks: bool,
    /// Timing mark side as a fraction of frame width
    pub timing_mark_ratio: f64,
    /// Components at least this solid are markers, not bubbles
    pub max_bubble_fill: f64,
    /// Binarization used to find marks on the aligned page
    pub binarize: BinarizeMethod,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            fill_threshold: 0.5,
            dark_threshold: 128,
            default_radius_ratio: 0.1,
            snap_to_timing_marks: false,
            timing_mark_ratio: 0.12,
            max_bubble_fill: 0.9,
            binarize: BinarizeMethod::Otsu,
        }
    }
}

impl DetectionOptions {
    /// Set the fill threshold
    pub fn with_fill_threshold(mut self, threshold: f64) -> Self {
        self.fill_threshold = threshold;
        self
    }

    /// Set the ink gray level
    pub fn with_dark_threshold(mut self, threshold: u8) -> Self {
        self.dark_threshold = threshold;
        self
    }

    /// Set the fallback bubble radius ratio
    pub fn with_default_radius_ratio(mut self, ratio: f64) -> Self {
        self.default_radius_ratio = ratio;
        self
    }

    /// Enable or disable timing mark snapping
    pub fn with_timing_snap(mut self, enabled: bool) -> Self {
        self.snap_to_timing_marks = enabled;
        self
    }
}

/// Fraction of pixels darker than `dark_threshold` whose centers lie
/// within `radius` of `center`. An empty mask yields 0.
pub fn measure_fill(gray: &Pix, center: Point, radius: f64, dark_threshold: u8) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let x0 = ((center.x - radius).floor() as i64).max(0);
    let x1 = ((center.x + radius).ceil() as i64).min(w);
    let y0 = ((center.y - radius).floor() as i64).max(0);
    let y1 = ((center.y + radius).ceil() as i64).min(h);
    let r2 = radius * radius;

    let (mut total, mut dark) = (0u64, 0u64);
    for y in y0..y1 {
        let dy = y as f64 + 0.5 - center.y;
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - center.x;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            total += 1;
            if gray.get_pixel_unchecked(x as u32, y as u32) < dark_threshold as u32 {
                dark += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        dark as f64 / total as f64
    }
}

/// Classify a fill fraction. The threshold itself counts as filled.
///
/// Returns `(is_filled, confidence)` where confidence is the distance from
/// the threshold normalized by the room on that side, clamped to `[0, 1]`.
pub fn classify_fill(fraction: f64, threshold: f64) -> (bool, f64) {
    let filled = fraction >= threshold;
    let room = if filled { 1.0 - threshold } else { threshold };
    let confidence = if room <= 0.0 {
        1.0
    } else {
        ((fraction - threshold).abs() / room).clamp(0.0, 1.0)
    };
    (filled, confidence)
}

fn measure(
    gray: &Pix,
    expected: &ExpectedBubble,
    center: Point,
    radius: f64,
    options: &DetectionOptions,
) -> BubbleDetectionResult {
    let fill = measure_fill(gray, center, radius, options.dark_threshold);
    let (is_filled, confidence) = classify_fill(fill, options.fill_threshold);
    BubbleDetectionResult {
        student_id: expected.student_id.clone(),
        student_name: expected.student_name.clone(),
        is_filled,
        fill_percentage: fill,
        confidence,
        bubble_center: Some(center),
    }
}

/// Common interface of the bubble detectors
pub trait BubbleDetector: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Produce one result per expected bubble, in the order given.
    fn detect(
        &self,
        page: &AlignedPage,
        expected: &[ExpectedBubble],
    ) -> RecogResult<Vec<BubbleDetectionResult>>;
}

/// Detector driven by stored frame ratios
#[derive(Debug, Clone, Default)]
pub struct TemplateDetector {
    options: DetectionOptions,
}

impl TemplateDetector {
    pub fn new(options: DetectionOptions) -> Self {
        Self { options }
    }
}

impl BubbleDetector for TemplateDetector {
    fn name(&self) -> &'static str {
        "template"
    }

    fn detect(
        &self,
        page: &AlignedPage,
        expected: &[ExpectedBubble],
    ) -> RecogResult<Vec<BubbleDetectionResult>> {
        let gray = to_gray(&page.image)?;
        let marks = if self.options.snap_to_timing_marks {
            find_timing_marks(page, &self.options)?
        } else {
            Vec::new()
        };
        Ok(expected
            .iter()
            .map(|e| match e.position {
                Some(position) => {
                    let mut center = position.to_pixels(&page.frame);
                    let radius = e.radius_ratio.unwrap_or(self.options.default_radius_ratio)
                        * page.frame.width;
                    if let Some(y) = snap_y(center.y, &marks, radius) {
                        center.y = y;
                    }
                    measure(&gray, e, center, radius, &self.options)
                }
                None => BubbleDetectionResult::unmatched(e),
            })
            .collect())
    }
}

/// Detector that finds bubbles on the page itself
#[derive(Debug, Clone, Default)]
pub struct DynamicDetector {
    options: DetectionOptions,
}

impl DynamicDetector {
    pub fn new(options: DetectionOptions) -> Self {
        Self { options }
    }

    /// Bubble-like components inside the frame, top to bottom.
    pub fn find_bubbles(&self, page: &AlignedPage) -> RecogResult<Vec<ConnectedComponent>> {
        let gray = to_gray(&page.image)?;
        let frame = &page.frame;
        let diameter = 2.0 * self.options.default_radius_ratio * frame.width;
        let components = dark_components(&gray, 0, self.options.binarize)?;
        let mut bubbles: Vec<ConnectedComponent> = ComponentFilter::new()
            .side_range(0.7 * diameter, 1.5 * diameter)
            .max_aspect(1.4)
            .max_fill(self.options.max_bubble_fill)
            .reject_border(gray.width(), gray.height())
            .apply(&components)
            .into_iter()
            .filter(|c| inside(frame, c.centroid_x, c.centroid_y))
            .collect();
        bubbles.sort_by(|a, b| {
            let (ax, ay) = a.bounds.center();
            let (bx, by) = b.bounds.center();
            ay.total_cmp(&by).then(ax.total_cmp(&bx))
        });
        Ok(bubbles)
    }
}

fn inside(frame: &FrameBounds, x: f64, y: f64) -> bool {
    x >= frame.left && x <= frame.right() && y >= frame.top && y <= frame.bottom()
}

impl BubbleDetector for DynamicDetector {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn detect(
        &self,
        page: &AlignedPage,
        expected: &[ExpectedBubble],
    ) -> RecogResult<Vec<BubbleDetectionResult>> {
        let gray = to_gray(&page.image)?;
        let bubbles = self.find_bubbles(page)?;
        let radius = self.options.default_radius_ratio * page.frame.width;
        if bubbles.len() != expected.len() {
            tracing::warn!(
                found = bubbles.len(),
                expected = expected.len(),
                "bubble count differs from roster"
            );
        }

        // pair the i-th bubble from the top with the i-th row
        let mut by_row: Vec<usize> = (0..expected.len()).collect();
        by_row.sort_by_key(|&i| expected[i].row_number);
        let mut results: Vec<Option<BubbleDetectionResult>> = vec![None; expected.len()];
        for (rank, &i) in by_row.iter().enumerate() {
            let result = match bubbles.get(rank) {
                Some(c) => {
                    let (cx, cy) = c.bounds.center();
                    measure(&gray, &expected[i], Point::new(cx, cy), radius, &self.options)
                }
                None => BubbleDetectionResult::unmatched(&expected[i]),
            };
            results[i] = Some(result);
        }
        Ok(results
            .into_iter()
            .zip(expected)
            .map(|(r, e)| r.unwrap_or_else(|| BubbleDetectionResult::unmatched(e)))
            .collect())
    }
}

/// Pick the detector: stored ratios when every row has them, otherwise
/// dynamic detection.
pub fn select_detector(
    expected: &[ExpectedBubble],
    options: &DetectionOptions,
) -> Box<dyn BubbleDetector> {
    if !expected.is_empty() && expected.iter().all(|e| e.position.is_some()) {
        Box::new(TemplateDetector::new(options.clone()))
    } else {
        Box::new(DynamicDetector::new(options.clone()))
    }
}

/// Vertical centers of the timing marks left of the frame, top to bottom.
pub fn find_timing_marks(page: &AlignedPage, options: &DetectionOptions) -> RecogResult<Vec<f64>> {
    let gray = to_gray(&page.image)?;
    let frame = &page.frame;
    let side = options.timing_mark_ratio * frame.width;
    let components = dark_components(&gray, 0, options.binarize)?;
    let x_min = frame.left - 0.4 * frame.width;
    let x_max = frame.left - 0.1 * frame.width;
    let mut ys: Vec<f64> = ComponentFilter::new()
        .side_range(0.6 * side, 1.5 * side)
        .max_aspect(1.4)
        .min_fill(0.85)
        .apply(&components)
        .into_iter()
        .filter(|c| c.centroid_x >= x_min && c.centroid_x <= x_max)
        .map(|c| c.centroid_y)
        .collect();
    ys.sort_by(f64::total_cmp);
    Ok(ys)
}

/// Nearest timing mark within half a row pitch of `y`.
///
/// With fewer than two marks the pitch is unknown and `2 * radius` is used
/// as the tolerance.
fn snap_y(y: f64, marks: &[f64], radius: f64) -> Option<f64> {
    let nearest = marks
        .iter()
        .copied()
        .min_by(|a, b| (a - y).abs().total_cmp(&(b - y).abs()))?;
    let tolerance = if marks.len() >= 2 {
        let mut gaps: Vec<f64> = marks.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.sort_by(f64::total_cmp);
        gaps[gaps.len() / 2] / 2.0
    } else {
        2.0 * radius
    };
    ((nearest - y).abs() <= tolerance).then_some(nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationFrame;
    use bubblemark_core::PixelDepth;
    use bubblemark_transform::Homography;

    fn expected(id: &str, row: u32, ratio: Option<(f64, f64)>) -> ExpectedBubble {
        ExpectedBubble {
            student_id: id.to_string(),
            student_name: format!("Student {}", id),
            row_number: row,
            position: ratio.map(|(x, y)| NormalizedPoint::new(x, y).unwrap()),
            radius_ratio: Some(0.1),
        }
    }

    /// Canonical page: frame 100 x 200 at (40, 40), bubbles at x ratio 0.6
    fn page(filled: &[bool]) -> AlignedPage {
        let mut pm = Pix::new_filled(180, 280, PixelDepth::Bit8, 255).unwrap().to_mut();
        for (i, &f) in filled.iter().enumerate() {
            let (cx, cy) = (100.0, 80.0 + 40.0 * i as f64);
            pm.stroke_circle(cx, cy, 10.0, 0.8, 0);
            if f {
                pm.fill_disk(cx, cy, 10.0, 30);
            }
            // timing mark
            pm.fill_rect(12.0, cy - 6.0, 24.0, cy + 6.0, 0);
        }
        let frame = FrameBounds::new(40.0, 40.0, 100.0, 200.0).unwrap();
        let c = frame.corners();
        AlignedPage {
            image: pm.into(),
            frame,
            calibration: CalibrationFrame {
                top_left: c[0],
                top_right: c[1],
                bottom_left: c[2],
                bottom_right: c[3],
            },
            homography: Homography::identity(),
        }
    }

    #[test]
    fn test_classify_threshold_is_inclusive() {
        assert_eq!(classify_fill(0.5, 0.5), (true, 0.0));
        let (filled, conf) = classify_fill(0.25, 0.5);
        assert!(!filled && (conf - 0.5).abs() < 1e-12);
        assert_eq!(classify_fill(1.0, 0.5), (true, 1.0));
        assert_eq!(classify_fill(0.0, 0.0), (true, 0.0));
    }

    #[test]
    fn test_measure_fill_half_disk() {
        let mut pm = Pix::new_filled(40, 40, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.fill_rect(0.0, 0.0, 40.0, 20.0, 0);
        let f = measure_fill(&pm.into(), Point::new(20.0, 20.0), 8.0, 128);
        assert!((f - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_template_detection() {
        let page = page(&[true, false, true]);
        let rows = [
            expected("S1", 1, Some((0.6, 0.2))),
            expected("S2", 2, Some((0.6, 0.4))),
            expected("S3", 3, Some((0.6, 0.6))),
        ];
        let detector = select_detector(&rows, &DetectionOptions::default());
        assert_eq!(detector.name(), "template");
        let results = detector.detect(&page, &rows).unwrap();
        let filled: Vec<bool> = results.iter().map(|r| r.is_filled).collect();
        assert_eq!(filled, vec![true, false, true]);
        assert!(results[1].fill_percentage < 0.3);
    }

    #[test]
    fn test_dynamic_pairs_by_row_and_pads() {
        let page = page(&[false, true]);
        let rows = [
            expected("B", 2, None),
            expected("A", 1, None),
            expected("C", 3, None),
        ];
        let detector = select_detector(&rows, &DetectionOptions::default());
        assert_eq!(detector.name(), "dynamic");
        let results = detector.detect(&page, &rows).unwrap();
        assert_eq!(results.len(), 3);
        // row 2 is the second bubble from the top
        assert!(results[0].is_filled);
        assert!(!results[1].is_filled && results[1].bubble_center.is_some());
        assert_eq!(results[2].confidence, 0.0);
        assert!(results[2].bubble_center.is_none());
    }

    #[test]
    fn test_timing_snap() {
        let page = page(&[true, true]);
        let opts = DetectionOptions::default().with_timing_snap(true);
        let marks = find_timing_marks(&page, &opts).unwrap();
        assert_eq!(marks.len(), 2);
        // stored ratio off by 5 px vertically
        let rows = [expected("S1", 1, Some((0.6, 0.225)))];
        let results = TemplateDetector::new(opts).detect(&page, &rows).unwrap();
        let c = results[0].bubble_center.unwrap();
        assert!((c.y - 80.0).abs() < 0.5);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let page = page(&[true, false]);
        let rows = [expected("A", 1, None), expected("B", 2, None)];
        let d = DynamicDetector::new(DetectionOptions::default());
        assert_eq!(d.detect(&page, &rows).unwrap(), d.detect(&page, &rows).unwrap());
    }
}
