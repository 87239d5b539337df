//! Sheet round trip regression test
//!
//! Generates a sheet, prints it to pixels at 150 DPI, marks one bubble and
//! reads it back through barcode decoding, alignment and template-driven
//! detection.

use bubblemark_core::{Point, mm_to_pt};
use bubblemark_recog::{
    AlignOptions, BarcodeScanOptions, CalibrationOptions, DetectionOptions, align_page,
    read_page_barcode, select_detector,
};
use bubblemark_sheet::{
    BubbleTemplate, IdentifierCodec, InMemoryTemplateStore, LectureIdentifier, SheetGenerator,
    SheetError, SheetLayout, Student, TemplateStore,
};
use bubblemark_test::RegParams;
use bubblemark_test::fixtures::fill_bubble;

const DPI: f64 = 150.0;

fn to_px(t: &BubbleTemplate) -> (Point, f64) {
    let s = DPI / 72.0;
    (Point::new(t.bubble_x * s, t.bubble_y * s), t.bubble_radius * s)
}

#[test]
fn sheet_reg() {
    let mut rp = RegParams::new("sheet");

    let generator =
        SheetGenerator::new(SheetLayout::default(), IdentifierCodec::default()).expect("generator");
    let students: Vec<Student> = (1..=34)
        .map(|i| Student::new(format!("2024{:04}", i), format!("Student Number {}", i)))
        .collect();
    let lecture = LectureIdentifier::new("CS101-2024-10-01")
        .with_course("CS101")
        .with_date("2024-10-01");
    let doc = generator.generate(&lecture, &students).expect("generate");
    rp.compare_values(2.0, doc.pages.len() as f64, 0.0);
    rp.compare_values(4.0, doc.pages[1].templates.len() as f64, 0.0);

    let store = InMemoryTemplateStore::new();
    doc.save_templates(&store).expect("save");

    // page 2 has four students; student 3 attends
    let page = &doc.pages[1];
    let raster = doc.render(DPI).expect("render");
    let (center, radius) = to_px(&page.templates[2]);
    let scan = fill_bubble(&raster[1], center, radius);
    rp.write_pix(&scan, "scan").expect("write");

    let payload = read_page_barcode(&scan, &BarcodeScanOptions::default()).expect("barcode");
    rp.compare_strings(page.payload.as_bytes(), payload.as_bytes());
    let decoded = generator.codec().decode(&payload).expect("decode");
    rp.compare_strings(lecture.lecture_id.as_bytes(), decoded.lecture_id.as_bytes());
    rp.compare_values(2.0, decoded.page as f64, 0.0);
    rp.compare_values(2.0, decoded.total_pages as f64, 0.0);

    let templates = store
        .get_templates(&decoded.lecture_id, decoded.page)
        .expect("templates");
    let aligned = align_page(&scan, &CalibrationOptions::default(), &AlignOptions::default())
        .expect("align");
    // frame of a 4-row page is 25 x 39 mm
    let px_per_mm = DPI / 25.4;
    rp.compare_values(25.0 * px_per_mm, aligned.frame.width, 2.0);
    rp.compare_values(39.0 * px_per_mm, aligned.frame.height, 2.0);

    let expected: Vec<_> = templates.iter().map(|t| t.expectation()).collect();
    let detector = select_detector(&expected, &DetectionOptions::default());
    rp.compare_strings(b"template", detector.name().as_bytes());
    let results = detector.detect(&aligned, &expected).expect("detect");
    let filled: Vec<bool> = results.iter().map(|r| r.is_filled).collect();
    rp.compare_marks(&[false, false, true, false], &filled);
    rp.compare_strings(b"20240033", results[2].student_id.as_bytes());

    // the printed ring alone stays well under the threshold
    let max_empty = results
        .iter()
        .filter(|r| !r.is_filled)
        .map(|r| r.fill_percentage)
        .fold(0.0, f64::max);
    rp.compare_values(1.0, (max_empty < 0.35) as u8 as f64, 0.0);

    // the PDF carries the same pages
    let pdf = doc.to_pdf().expect("pdf");
    rp.compare_values(1.0, pdf.starts_with(b"%PDF-") as u8 as f64, 0.0);
    rp.compare_values(mm_to_pt(210.0), page.drawing.width_pt, 1e-9);

    // a repeated id would give two rows the same template key
    let mut repeated = students.clone();
    repeated.push(Student::new("20240007", "Someone Else"));
    rp.check(
        matches!(
            generator.generate(&lecture, &repeated),
            Err(SheetError::DuplicateStudent(ref id)) if id == "20240007"
        ),
        "duplicate student id rejected",
    );

    assert!(rp.cleanup(), "sheet regression test failed");
}
