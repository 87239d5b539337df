//! Bubblemark - Attendance by optical mark recognition
//!
//! Print a roster as bubble sheets, collect the scans, and turn every
//! shaded bubble into an attendance record.
//!
//! # Overview
//!
//! - [`sheet`]: printable sheets with a page identifier barcode, corner
//!   markers and one bubble per student
//! - [`recog`]: barcode reading, marker calibration, perspective alignment
//!   and bubble detection on a scanned page
//! - [`pipeline`]: the upload-to-attendance job with circuit-breaker
//!   protected submission
//! - [`io`], [`filter`], [`region`], [`transform`]: the image plumbing
//!   underneath
//!
//! # Example
//!
//! ```
//! use bubblemark::sheet::{IdentifierCodec, LectureIdentifier, SheetGenerator, SheetLayout, Student};
//!
//! let generator = SheetGenerator::new(SheetLayout::default(), IdentifierCodec::default()).unwrap();
//! let doc = generator
//!     .generate(&LectureIdentifier::new("LEC-1"), &[Student::new("S1", "Ada")])
//!     .unwrap();
//! assert_eq!(doc.pages.len(), 1);
//! assert_eq!(doc.pages[0].payload.len(), 12);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use bubblemark_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use bubblemark_filter as filter;
pub use bubblemark_io as io;
pub use bubblemark_pipeline as pipeline;
pub use bubblemark_recog as recog;
pub use bubblemark_region as region;
pub use bubblemark_sheet as sheet;
pub use bubblemark_transform as transform;
