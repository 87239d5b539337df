//! Sheet generation
//!
//! Splits a roster into pages, draws each page and computes the bubble
//! templates that detection later relies on. Drawing and templates come
//! from the same [`SheetLayout`], so the ratios always refer to the frame
//! spanned by the printed markers.

use crate::codec::{IdentifierCodec, LectureIdentifier};
use crate::layout::SheetLayout;
use crate::store::TemplateStore;
use crate::template::{BubbleTemplate, Student};
use crate::{SheetError, SheetResult};
use bubblemark_core::{FrameBounds, NormalizedPoint, PageDrawing, Pix, Point, mm_to_pt};
use bubblemark_io::pdf::{PdfOptions, write_pdf_drawings};
use bubblemark_recog::barcode::encode_bar_string;
use std::collections::HashSet;

const INK: u8 = 0;
const RULE: u8 = 90;

/// One generated page
#[derive(Debug, Clone)]
pub struct SheetPage {
    pub page_number: u32,
    pub total_pages: u32,
    /// The 12-digit identifier printed on the page
    pub payload: String,
    pub drawing: PageDrawing,
    pub templates: Vec<BubbleTemplate>,
}

/// All pages generated for one lecture
#[derive(Debug, Clone)]
pub struct SheetDocument {
    pub lecture: LectureIdentifier,
    pub pages: Vec<SheetPage>,
}

impl SheetDocument {
    /// Templates of every page, in page and row order
    pub fn templates(&self) -> impl Iterator<Item = &BubbleTemplate> {
        self.pages.iter().flat_map(|p| p.templates.iter())
    }

    pub fn total_students(&self) -> usize {
        self.pages.iter().map(|p| p.templates.len()).sum()
    }

    /// Persist every page's templates
    pub fn save_templates(&self, store: &dyn TemplateStore) -> SheetResult<()> {
        for page in &self.pages {
            store.save_templates(&page.templates)?;
        }
        Ok(())
    }

    /// Write the sheet as a vector PDF
    pub fn to_pdf(&self) -> SheetResult<Vec<u8>> {
        let drawings: Vec<PageDrawing> = self.pages.iter().map(|p| p.drawing.clone()).collect();
        let options = PdfOptions::with_title(format!("Attendance {}", self.lecture.lecture_id));
        Ok(write_pdf_drawings(&drawings, &options)?)
    }

    /// Rasterize every page to 8 bpp grayscale at `dpi`
    pub fn render(&self, dpi: f64) -> SheetResult<Vec<Pix>> {
        self.pages
            .iter()
            .map(|p| Ok(bubblemark_core::render_drawing(&p.drawing, dpi)?))
            .collect()
    }
}

/// Bubble sheet generator
#[derive(Debug, Clone)]
pub struct SheetGenerator {
    layout: SheetLayout,
    codec: IdentifierCodec,
}

impl SheetGenerator {
    /// Create a generator, validating the layout.
    pub fn new(layout: SheetLayout, codec: IdentifierCodec) -> SheetResult<Self> {
        layout.validate()?;
        Ok(Self { layout, codec })
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    /// Lay out `students` over as many pages as needed.
    ///
    /// # Errors
    ///
    /// - [`SheetError::EmptyRoster`] if `students` is empty.
    /// - [`SheetError::DuplicateStudent`] if a student id appears twice.
    /// - [`SheetError::Format`] if the page count exceeds two digits.
    pub fn generate(
        &self,
        lecture: &LectureIdentifier,
        students: &[Student],
    ) -> SheetResult<SheetDocument> {
        if students.is_empty() {
            return Err(SheetError::EmptyRoster);
        }
        let mut seen = HashSet::with_capacity(students.len());
        if let Some(dup) = students.iter().find(|s| !seen.insert(s.student_id.as_str())) {
            return Err(SheetError::DuplicateStudent(dup.student_id.clone()));
        }
        let total = self.layout.page_count(students.len()) as u32;
        let mut pages = Vec::with_capacity(total as usize);
        for (i, chunk) in students.chunks(self.layout.rows_per_page).enumerate() {
            let page_number = i as u32 + 1;
            let payload = self.codec.encode(&lecture.lecture_id, page_number, total)?;
            let templates = self.templates_for(&lecture.lecture_id, page_number, chunk)?;
            let drawing = self.draw_page(lecture, chunk, page_number, total, &payload)?;
            pages.push(SheetPage {
                page_number,
                total_pages: total,
                payload,
                drawing,
                templates,
            });
        }
        tracing::info!(
            lecture_id = %lecture.lecture_id,
            pages = total,
            students = students.len(),
            "sheet generated"
        );
        Ok(SheetDocument {
            lecture: lecture.clone(),
            pages,
        })
    }

    fn templates_for(
        &self,
        lecture_id: &str,
        page_number: u32,
        students: &[Student],
    ) -> SheetResult<Vec<BubbleTemplate>> {
        let l = &self.layout;
        let frame_mm = l.frame_mm(students.len())?;
        let frame = FrameBounds::new(
            mm_to_pt(frame_mm.left),
            mm_to_pt(frame_mm.top),
            mm_to_pt(frame_mm.width),
            mm_to_pt(frame_mm.height),
        )?;
        students
            .iter()
            .enumerate()
            .map(|(row, s)| {
                let center = Point::new(mm_to_pt(l.bubble_x), mm_to_pt(l.row_y(row)));
                let ratio = NormalizedPoint::from_absolute(center, &frame)?;
                Ok(BubbleTemplate {
                    lecture_id: lecture_id.to_string(),
                    page_number,
                    student_id: s.student_id.clone(),
                    student_name: s.name.clone(),
                    row_number: row as u32 + 1,
                    bubble_x: center.x,
                    bubble_y: center.y,
                    bubble_radius: mm_to_pt(l.bubble_radius),
                    bubble_x_ratio: Some(ratio.x_ratio),
                    bubble_y_ratio: Some(ratio.y_ratio),
                    bubble_radius_ratio: Some(l.radius_ratio()),
                })
            })
            .collect()
    }

    fn draw_page(
        &self,
        lecture: &LectureIdentifier,
        students: &[Student],
        page_number: u32,
        total: u32,
        payload: &str,
    ) -> SheetResult<PageDrawing> {
        let l = &self.layout;
        let p = mm_to_pt;
        let mut d = PageDrawing::new(p(l.page_width), p(l.page_height));
        let text_right = p(l.page_width - 10.0);

        // header
        d.text(p(l.content_left), p(20.0), 16.0, "Attendance Sheet", INK);
        let mut info = format!("Lecture {}", lecture.lecture_id);
        if let Some(course) = &lecture.course_id {
            info.push_str(&format!("  |  Course {}", course));
        }
        if let Some(date) = &lecture.date {
            info.push_str(&format!("  |  {}", date));
        }
        let info = PageDrawing::fit_text(&info, 10.0, text_right - p(l.content_left));
        d.text(p(l.content_left), p(28.0), 10.0, info, INK);
        d.text(
            p(l.content_left),
            p(34.0),
            9.0,
            format!("Page {} of {}", page_number, total),
            INK,
        );

        // column header above the frame
        let header_y = l.first_row_y - l.frame_margin_y - l.marker_size / 2.0 - 4.0;
        d.text(p(l.content_left + 2.0), p(header_y), 8.0, "No.", INK);
        d.text(p(l.content_left + 12.0), p(header_y), 8.0, "Student ID", INK);
        d.text(p(l.content_left + 42.0), p(header_y), 8.0, "Name", INK);
        let label = "Attendance";
        let label_x = p(l.bubble_x) - PageDrawing::text_width(label, 7.0) / 2.0;
        d.text(label_x, p(header_y), 7.0, label, INK);
        let header_rule = header_y + 2.0;
        d.line(
            p(l.content_left),
            p(header_rule),
            p(l.content_right),
            p(header_rule),
            p(0.4),
            INK,
        );

        // rows
        let name_x = l.content_left + 42.0;
        for (row, s) in students.iter().enumerate() {
            let y = l.row_y(row);
            let baseline = p(y + 1.2);
            d.text(p(l.content_left + 2.0), baseline, 9.0, format!("{}", row + 1), INK);
            d.text(
                p(l.content_left + 12.0),
                baseline,
                9.0,
                PageDrawing::fit_text(&s.student_id, 9.0, p(28.0)),
                INK,
            );
            d.text(
                p(name_x),
                baseline,
                9.0,
                PageDrawing::fit_text(&s.name, 9.0, p(l.content_right - name_x - 2.0)),
                INK,
            );
            let rule_y = p(y + l.row_pitch / 2.0);
            let rule_w = if (row + 1) % 5 == 0 { 0.35 } else { 0.15 };
            d.line(
                p(l.content_left),
                rule_y,
                p(l.content_right),
                rule_y,
                p(rule_w),
                RULE,
            );
            d.centered_square(p(l.timing_mark_x), p(y), p(l.timing_mark_size), INK);
            d.circle(p(l.bubble_x), p(y), p(l.bubble_radius), p(l.bubble_stroke), INK);
        }

        // calibration markers at the frame corners
        let frame = l.frame_mm(students.len())?;
        for corner in frame.corners() {
            d.centered_square(p(corner.x), p(corner.y), p(l.marker_size), INK);
        }

        self.draw_barcode(&mut d, payload)?;

        // footer
        let footer_y = p(l.page_height - 7.0);
        d.text(p(l.content_left), footer_y, 8.0, format!("ID {}", payload), INK);
        d.text(
            p(l.content_left + 50.0),
            footer_y,
            8.0,
            "Fill the circle completely with a dark pen",
            INK,
        );
        Ok(d)
    }

    /// Vertical Interleaved 2 of 5 symbol in the left margin
    fn draw_barcode(&self, d: &mut PageDrawing, payload: &str) -> SheetResult<()> {
        let l = &self.layout;
        let bars = encode_bar_string(payload).map_err(|e| SheetError::Format(e.to_string()))?;
        let mut y = l.barcode_top;
        for (i, c) in bars.chars().enumerate() {
            let len = if c == '2' {
                l.barcode_module * l.barcode_wide_ratio
            } else {
                l.barcode_module
            };
            if i % 2 == 0 {
                d.rect(
                    mm_to_pt(l.barcode_x),
                    mm_to_pt(y),
                    mm_to_pt(l.barcode_width),
                    mm_to_pt(len),
                    INK,
                );
            }
            y += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblemark_core::Shape;

    fn roster(n: usize) -> Vec<Student> {
        (1..=n)
            .map(|i| Student::new(format!("S{:04}", i), format!("Student {}", i)))
            .collect()
    }

    fn generator() -> SheetGenerator {
        SheetGenerator::new(SheetLayout::default(), IdentifierCodec::default()).unwrap()
    }

    #[test]
    fn test_pages_and_templates() {
        let doc = generator()
            .generate(&LectureIdentifier::new("LEC-1"), &roster(65))
            .unwrap();
        assert_eq!(doc.pages.len(), 3);
        let counts: Vec<usize> = doc.pages.iter().map(|p| p.templates.len()).collect();
        assert_eq!(counts, vec![30, 30, 5]);
        assert_eq!(doc.total_students(), 65);
        for t in doc.templates() {
            let (x, y) = (t.bubble_x_ratio.unwrap(), t.bubble_y_ratio.unwrap());
            assert!((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
            assert!((x - 0.6).abs() < 1e-9);
        }
        let last = &doc.pages[2];
        assert!(last.payload.ends_with("0303"));
        assert_eq!(last.templates[0].row_number, 1);
        assert_eq!(last.templates[0].student_id, "S0061");
    }

    #[test]
    fn test_single_student_is_centered() {
        let doc = generator()
            .generate(&LectureIdentifier::new("LEC-1"), &roster(1))
            .unwrap();
        let t = &doc.pages[0].templates[0];
        assert!((t.bubble_y_ratio.unwrap() - 0.5).abs() < 1e-9);
        assert!((t.bubble_radius_ratio.unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_roster() {
        assert!(matches!(
            generator().generate(&LectureIdentifier::new("LEC-1"), &[]),
            Err(SheetError::EmptyRoster)
        ));
    }

    #[test]
    fn test_duplicate_student_rejected() {
        let students = vec![
            Student::new("S1", "Alice"),
            Student::new("S2", "Carol"),
            Student::new("S1", "Bob"),
        ];
        match generator().generate(&LectureIdentifier::new("LEC-1"), &students) {
            Err(SheetError::DuplicateStudent(id)) => assert_eq!(id, "S1"),
            other => panic!("expected duplicate error, got {:?}", other.map(|d| d.pages.len())),
        }
    }

    #[test]
    fn test_long_names_are_truncated() {
        let students = vec![Student::new("S1", "N".repeat(400))];
        let doc = generator()
            .generate(&LectureIdentifier::new("L"), &students)
            .unwrap();
        let longest = doc.pages[0]
            .drawing
            .shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Text { text, .. } => Some(text.chars().count()),
                _ => None,
            })
            .max()
            .unwrap();
        assert!(longest < 100);
    }

    #[test]
    fn test_left_band_holds_only_barcode() {
        let doc = generator()
            .generate(&LectureIdentifier::new("L"), &roster(3))
            .unwrap();
        let band = mm_to_pt(210.0 * 0.08);
        let mut bars = 0;
        for shape in &doc.pages[0].drawing.shapes {
            let left = match shape {
                Shape::Rect { x, w, .. } if *x < band => {
                    // barcode bars lie entirely inside the band
                    assert!(x + w < band);
                    bars += 1;
                    continue;
                }
                Shape::Rect { x, .. } => *x,
                Shape::Line { x1, x2, .. } => x1.min(*x2),
                Shape::Circle { cx, r, .. } | Shape::Disk { cx, r, .. } => cx - r,
                Shape::Text { x, .. } => *x,
            };
            assert!(left >= band, "{:?}", shape);
        }
        // start 2 + 6 pairs x 5 + stop 2
        assert_eq!(bars, 34);
    }

    #[test]
    fn test_pdf_and_render() {
        let doc = generator()
            .generate(&LectureIdentifier::new("L"), &roster(2))
            .unwrap();
        let pdf = doc.to_pdf().unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        let pages = doc.render(100.0).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width(), (mm_to_pt(210.0) * 100.0 / 72.0).round() as u32);
    }
}
