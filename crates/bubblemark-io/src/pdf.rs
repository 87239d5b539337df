//! Vector PDF output for page drawings
//!
//! Sheets are written as vector graphics rather than embedded rasters, so
//! marker edges and barcode bars stay sharp at any printer resolution.
//!
//! # Example
//!
//! ```no_run
//! use bubblemark_core::PageDrawing;
//! use bubblemark_io::pdf::{PdfOptions, write_pdf_drawings};
//!
//! let page = PageDrawing::new(595.276, 841.89);
//! let pdf_data = write_pdf_drawings(&[page], &PdfOptions::default()).unwrap();
//! assert!(pdf_data.starts_with(b"%PDF-"));
//! ```

use crate::{IoError, IoResult};
use bubblemark_core::{PageDrawing, Shape};
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// PDF output options
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Document title (optional)
    pub title: Option<String>,
    /// Deflate content streams
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            compress: true,
        }
    }
}

impl PdfOptions {
    /// Create options with a title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Enable or disable content stream compression
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Write page drawings as a multi-page vector PDF.
///
/// # Errors
///
/// Returns [`IoError::InvalidData`] if `pages` is empty.
pub fn write_pdf_drawings(pages: &[PageDrawing], options: &PdfOptions) -> IoResult<Vec<u8>> {
    if pages.is_empty() {
        return Err(IoError::InvalidData("no pages provided".to_string()));
    }

    let mut pdf = Pdf::new();

    // Catalog(1), Pages(2), Font(3), [Page(4+i*2), Contents(5+i*2)]...
    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let font_id = Ref::new(3);
    let page_refs: Vec<Ref> = (0..pages.len())
        .map(|i| Ref::new((4 + i * 2) as i32))
        .collect();

    pdf.catalog(catalog_id).pages(pages_id);
    if let Some(ref title) = options.title {
        let info_id = Ref::new((4 + pages.len() * 2) as i32);
        pdf.document_info(info_id).title(TextStr(title));
    }
    pdf.pages(pages_id)
        .kids(page_refs.iter().copied())
        .count(pages.len() as i32);
    pdf.type1_font(font_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    for (i, drawing) in pages.iter().enumerate() {
        let page_id = page_refs[i];
        let contents_id = Ref::new((5 + i * 2) as i32);

        let content_data = page_content(drawing);
        if options.compress {
            pdf.stream(contents_id, &compress_to_vec_zlib(&content_data, 6))
                .filter(Filter::FlateDecode);
        } else {
            pdf.stream(contents_id, &content_data);
        }

        let mut page = pdf.page(page_id);
        page.parent(pages_id);
        page.media_box(Rect::new(
            0.0,
            0.0,
            drawing.width_pt as f32,
            drawing.height_pt as f32,
        ));
        page.contents(contents_id);
        page.resources().fonts().pair(Name(b"F1"), font_id);
        page.finish();
    }

    Ok(pdf.finish())
}

/// Build the content stream of one page.
///
/// Drawings use a top-left origin; PDF user space grows upward, so every
/// y coordinate is flipped against the page height.
fn page_content(drawing: &PageDrawing) -> Vec<u8> {
    let h = drawing.height_pt as f32;
    let mut content = Content::new();

    for shape in &drawing.shapes {
        match shape {
            Shape::Rect { x, y, w, h: rh, gray } => {
                content.set_fill_gray(level(*gray));
                content.rect(*x as f32, h - (*y + *rh) as f32, *w as f32, *rh as f32);
                content.fill_nonzero();
            }
            Shape::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                gray,
            } => {
                content.set_stroke_gray(level(*gray));
                content.set_line_width(*width as f32);
                content.move_to(*x1 as f32, h - *y1 as f32);
                content.line_to(*x2 as f32, h - *y2 as f32);
                content.stroke();
            }
            Shape::Circle {
                cx,
                cy,
                r,
                stroke,
                gray,
            } => {
                content.set_stroke_gray(level(*gray));
                content.set_line_width(*stroke as f32);
                circle_path(&mut content, *cx as f32, h - *cy as f32, *r as f32);
                content.stroke();
            }
            Shape::Disk { cx, cy, r, gray } => {
                content.set_fill_gray(level(*gray));
                circle_path(&mut content, *cx as f32, h - *cy as f32, *r as f32);
                content.fill_nonzero();
            }
            Shape::Text {
                x,
                y,
                size,
                text,
                gray,
            } => {
                let bytes = latin1(text);
                content.set_fill_gray(level(*gray));
                content.begin_text();
                content.set_font(Name(b"F1"), *size as f32);
                content.next_line(*x as f32, h - *y as f32);
                content.show(Str(&bytes));
                content.end_text();
            }
        }
    }

    content.finish().to_vec()
}

fn level(gray: u8) -> f32 {
    gray as f32 / 255.0
}

/// Four Bezier quarter arcs approximating a circle.
fn circle_path(content: &mut Content, cx: f32, cy: f32, r: f32) {
    let k = KAPPA * r;
    content.move_to(cx + r, cy);
    content.cubic_to(cx + r, cy + k, cx + k, cy + r, cx, cy + r);
    content.cubic_to(cx - k, cy + r, cx - r, cy + k, cx - r, cy);
    content.cubic_to(cx - r, cy - k, cx - k, cy - r, cx, cy - r);
    content.cubic_to(cx + k, cy - r, cx + r, cy - k, cx + r, cy);
    content.close_path();
}

/// Encode for WinAnsi; characters outside Latin-1 become '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7e).contains(&code) || (0xa0..=0xff).contains(&code) {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> PageDrawing {
        let mut page = PageDrawing::new(200.0, 100.0);
        page.rect(10.0, 10.0, 20.0, 20.0, 0);
        page.circle(100.0, 50.0, 8.0, 0.8, 0);
        page.disk(150.0, 50.0, 8.0, 0);
        page.line(0.0, 90.0, 200.0, 90.0, 0.5, 128);
        page.text(20.0, 80.0, 10.0, "Zo\u{00eb} \u{4e2d}", 0);
        page
    }

    #[test]
    fn test_uncompressed_content_is_flipped() {
        let pdf = write_pdf_drawings(&[sample_page()], &PdfOptions::default().compress(false))
            .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&pdf);
        // rect at top y=10, h=20 lands at PDF y = 100 - 30 = 70
        assert!(text.contains("10 70 20 20 re"));
        assert!(text.contains("/Helvetica"));
    }

    #[test]
    fn test_multi_page_with_title() {
        let pages = vec![sample_page(), sample_page()];
        let pdf = write_pdf_drawings(&pages, &PdfOptions::with_title("Attendance")).unwrap();
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/Count 2"));
        assert!(write_pdf_drawings(&[], &PdfOptions::default()).is_err());
    }

    #[test]
    fn test_latin1_replaces_wide_chars() {
        assert_eq!(latin1("A\u{00eb}\u{4e2d}"), vec![b'A', 0xeb, b'?']);
    }
}
