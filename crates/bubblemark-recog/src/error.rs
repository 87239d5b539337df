//! Error types for bubblemark-recog

use thiserror::Error;

/// Errors that can occur during recognition operations
#[derive(Debug, Error)]
pub enum RecogError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] bubblemark_core::Error),

    /// Filter library error
    #[error("filter error: {0}")]
    Filter(#[from] bubblemark_filter::FilterError),

    /// Region library error
    #[error("region error: {0}")]
    Region(#[from] bubblemark_region::RegionError),

    /// Transform library error
    #[error("transform error: {0}")]
    Transform(#[from] bubblemark_transform::TransformError),

    /// Unsupported pixel depth for this operation
    #[error("unsupported depth: expected {expected}, got {actual}")]
    UnsupportedDepth { expected: &'static str, actual: u32 },

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Fewer than four usable calibration markers on the page
    #[error("calibration markers not found: {0}")]
    CalibrationNotFound(String),

    /// Four markers were found but they do not span a usable frame
    #[error("degenerate calibration frame: {0}")]
    DegenerateFrame(String),

    /// Barcode could not be located or decoded
    #[error("barcode error: {0}")]
    Barcode(String),

    /// Barcode payload has the wrong shape
    #[error("format error: {0}")]
    Format(String),
}

/// Result type for recognition operations
pub type RecogResult<T> = Result<T, RecogError>;
