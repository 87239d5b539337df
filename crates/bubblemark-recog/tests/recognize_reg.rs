//! Page recognition regression test
//!
//! Draws a three-row sheet at 4 px/mm, marks it with a pen, distorts it
//! like a phone photo and runs barcode reading, calibration, alignment and
//! both detectors over it.

use bubblemark_core::{NormalizedPoint, Pix, PixMut, PixelDepth, Point};
use bubblemark_recog::barcode::encode_bar_string;
use bubblemark_recog::{
    AlignOptions, BarcodeScanOptions, BubbleDetector, CalibrationOptions, DetectionOptions,
    CalibrationFrame, DynamicDetector, ExpectedBubble, RecogError, TemplateDetector, align_page,
    find_calibration_frame, frame_from_centers, read_page_barcode, render_overlay,
};
use bubblemark_transform::Homography;
use bubblemark_test::RegParams;
use bubblemark_test::fixtures::{fill_bubble, perspective_distort, shade_bubble};

const PX_PER_MM: f64 = 4.0;
const ROWS: [f64; 3] = [62.0, 69.0, 76.0];
const PAYLOAD: &str = "012345678901";
const SHEET: (u32, u32) = (840, 1188);
/// Corner offsets of the simulated phone photo
const SKEW: [(f64, f64); 4] = [(20.0, 10.0), (6.0, 16.0), (12.0, 4.0), (24.0, 18.0)];

fn mm(v: f64) -> f64 {
    v * PX_PER_MM
}

fn square(pm: &mut PixMut, cx_mm: f64, cy_mm: f64, side_mm: f64) {
    let h = side_mm / 2.0;
    pm.fill_rect(mm(cx_mm - h), mm(cy_mm - h), mm(cx_mm + h), mm(cy_mm + h), 0);
}

fn blank_sheet() -> Pix {
    let mut pm = Pix::new_filled(SHEET.0, SHEET.1, PixelDepth::Bit8, 255)
        .unwrap()
        .to_mut();
    for c in marker_centers_mm() {
        square(&mut pm, c.x, c.y, 6.0);
    }
    for &y in &ROWS {
        pm.stroke_circle(mm(170.0), mm(y), mm(2.5), 1.0, 0);
        square(&mut pm, 149.0, y, 3.0);
        pm.draw_line(mm(20.0), mm(y + 3.5), mm(140.0), mm(y + 3.5), 0.5, 0);
    }

    // vertical identifier in the left margin
    let module = 0.6;
    let mut y = 120.0;
    for (i, c) in encode_bar_string(PAYLOAD).unwrap().chars().enumerate() {
        let len = if c == '1' { module } else { module * 2.5 };
        if i % 2 == 0 {
            pm.fill_rect(mm(4.0), mm(y), mm(12.0), mm(y + len), 0);
        }
        y += len;
    }
    pm.into()
}

fn marker_centers_mm() -> [Point; 4] {
    let (top, bottom) = (ROWS[0] - 9.0, ROWS[2] + 9.0);
    [
        Point::new(155.0, top),
        Point::new(180.0, top),
        Point::new(155.0, bottom),
        Point::new(180.0, bottom),
    ]
}

/// Where the markers land after the skew, as a frame
fn skewed_frame() -> CalibrationFrame {
    let (w, h) = (SHEET.0 as f64, SHEET.1 as f64);
    let src = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ];
    let dst = [
        Point::new(SKEW[0].0, SKEW[0].1),
        Point::new(w - SKEW[1].0, SKEW[1].1),
        Point::new(SKEW[2].0, h - SKEW[2].1),
        Point::new(w - SKEW[3].0, h - SKEW[3].1),
    ];
    let skew = Homography::from_quad(&src, &dst).unwrap();
    let centers: Vec<Point> = marker_centers_mm()
        .iter()
        .map(|c| skew.project(Point::new(mm(c.x), mm(c.y))))
        .collect();
    frame_from_centers(&centers).unwrap()
}

fn roster(with_positions: bool) -> Vec<ExpectedBubble> {
    let (top, height) = (ROWS[0] - 9.0, ROWS[2] - ROWS[0] + 18.0);
    ROWS.iter()
        .enumerate()
        .map(|(i, &y)| ExpectedBubble {
            student_id: format!("S{:03}", i + 1),
            student_name: format!("Student {}", i + 1),
            row_number: i as u32 + 1,
            position: with_positions
                .then(|| NormalizedPoint::new(15.0 / 25.0, (y - top) / height).unwrap()),
            radius_ratio: with_positions.then_some(0.1),
        })
        .collect()
}

#[test]
fn recognize_reg() {
    let mut rp = RegParams::new("recognize");

    let sheet = blank_sheet();
    let marked = fill_bubble(&sheet, Point::new(mm(170.0), mm(ROWS[1])), mm(2.5));
    let marked = shade_bubble(&marked, Point::new(mm(170.0), mm(ROWS[2])), mm(2.5), 0.3);
    let scan = perspective_distort(&marked, SKEW).expect("distort");
    rp.write_pix(&scan, "scan").expect("write scan");

    // --- barcode ---
    let payload = read_page_barcode(&scan, &BarcodeScanOptions::default()).expect("barcode");
    rp.compare_strings(PAYLOAD.as_bytes(), payload.as_bytes());

    // --- calibration and alignment ---
    let page = align_page(&scan, &CalibrationOptions::default(), &AlignOptions::default())
        .expect("align");
    eprintln!("  frame: {:?}", page.frame);
    // the canonical frame keeps the photographed marker spacing
    let skewed = skewed_frame();
    rp.compare_values(skewed.mean_width(), page.frame.width, 2.5);
    rp.compare_values(skewed.mean_height(), page.frame.height, 2.5);
    rp.check(
        (page.frame.height / page.frame.width - 32.0 / 25.0).abs() < 0.08,
        "frame aspect survives the skew",
    );

    // --- template detection ---
    let options = DetectionOptions::default();
    let expected = roster(true);
    let results = TemplateDetector::new(options.clone())
        .detect(&page, &expected)
        .expect("template detect");
    rp.compare_values(3.0, results.len() as f64, 0.0);
    for (r, want) in results.iter().zip([false, true, false]) {
        eprintln!(
            "  {} filled={} fill={:.3} conf={:.3}",
            r.student_id, r.is_filled, r.fill_percentage, r.confidence
        );
        rp.compare_values(want as u8 as f64, r.is_filled as u8 as f64, 0.0);
    }
    rp.compare_values(1.0, (results[1].fill_percentage > 0.9) as u8 as f64, 0.0);

    // --- dynamic detection agrees ---
    let dynamic = DynamicDetector::new(options.clone())
        .detect(&page, &roster(false))
        .expect("dynamic detect");
    let filled: Vec<bool> = dynamic.iter().map(|r| r.is_filled).collect();
    rp.compare_marks(&[false, true, false], &filled);

    // --- snapping keeps the same answer ---
    let snapped = TemplateDetector::new(options.clone().with_timing_snap(true))
        .detect(&page, &expected)
        .expect("snapped detect");
    rp.check(snapped[1].is_filled, "snapped row 2 filled");

    let overlay = render_overlay(&page, &results, options.default_radius_ratio * page.frame.width)
        .expect("overlay");
    rp.compare_values(32.0, overlay.depth().bits() as f64, 0.0);
    rp.write_pix(&overlay, "overlay").expect("write overlay");

    // --- blank page has no markers ---
    let blank = Pix::new_filled(SHEET.0, SHEET.1, PixelDepth::Bit8, 255).unwrap();
    let err = find_calibration_frame(&blank, &CalibrationOptions::default());
    rp.compare_values(
        1.0,
        matches!(err, Err(RecogError::CalibrationNotFound(_))) as u8 as f64,
        0.0,
    );

    assert!(rp.cleanup(), "recognize regression test failed");
}
