//! bubblemark-recog - Reading scanned bubble sheets
//!
//! The recognition steps for one page image, in the order the pipeline
//! applies them:
//!
//! - [`barcode`]: read the Interleaved 2 of 5 page identifier
//! - [`calibration`]: find the four corner markers
//! - [`align`]: warp the page so the marker frame is a rectangle
//! - [`detect`]: classify each student's bubble as filled or empty
//! - [`visualize`]: draw the outcome on a color copy of the page
//!
//! # Quick Start
//!
//! ```no_run
//! use bubblemark_recog::{
//!     AlignOptions, CalibrationOptions, DetectionOptions, ExpectedBubble, align_page,
//!     select_detector,
//! };
//! use bubblemark_core::{Pix, PixelDepth};
//!
//! let pix = Pix::new(1240, 1754, PixelDepth::Bit8).unwrap();
//! let page = align_page(&pix, &CalibrationOptions::default(), &AlignOptions::default()).unwrap();
//! let roster: Vec<ExpectedBubble> = Vec::new();
//! let detector = select_detector(&roster, &DetectionOptions::default());
//! let results = detector.detect(&page, &roster).unwrap();
//! println!("{} results via {}", results.len(), detector.name());
//! ```

pub mod align;
pub mod barcode;
pub mod calibration;
pub mod detect;
mod error;
pub mod visualize;

pub use error::{RecogError, RecogResult};

pub use align::{AlignOptions, AlignedPage, align_page, align_to_frame};
pub use barcode::{BarcodeScanOptions, read_page_barcode};
pub use calibration::{
    CalibrationFrame, CalibrationOptions, find_calibration_frame, find_marker_candidates,
    frame_from_centers,
};
pub use detect::{
    BubbleDetectionResult, BubbleDetector, DetectionOptions, DynamicDetector, ExpectedBubble,
    TemplateDetector, classify_fill, find_timing_marks, measure_fill, select_detector,
};
pub use visualize::render_overlay;

// Re-export core for convenience
pub use bubblemark_core;
