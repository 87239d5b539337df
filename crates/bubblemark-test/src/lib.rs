//! bubblemark-test - Regression test framework for bubblemark
//!
//! Two modes are supported:
//!
//! - **Compare**: check computed values against expectations (default)
//! - **Display**: additionally write intermediate images to `tests/regout`
//!   for visual inspection
//!
//! # Usage
//!
//! ```ignore
//! use bubblemark_test::RegParams;
//!
//! let mut rp = RegParams::new("scenario");
//! rp.compare_values(2.0, results.len() as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "compare" or "display"
//!
//! The [`fixtures`] module builds synthetic scans: pen marks, perspective
//! distortion and multi-page documents.

mod error;
pub mod fixtures;
mod params;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

/// Get the path to the workspace root
fn workspace_root() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    // bubblemark-test is at crates/bubblemark-test, so go up two directories
    format!("{}/../..", manifest_dir)
}

/// Get the path to the regout (regression output) directory
pub fn regout_dir() -> String {
    format!("{}/tests/regout", workspace_root())
}
