//! Error types for bubblemark-core

use thiserror::Error;

/// Errors of the image container, the geometry types and the drawing model
#[derive(Error, Debug)]
pub enum Error {
    /// An image needs at least one pixel in each direction
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Pixel or sample access outside the image
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The operation does not handle images of this depth
    #[error("unsupported pixel depth: {0} bpp")]
    UnsupportedDepth(u32),

    /// A value outside its allowed range, such as a non-positive DPI or
    /// a frame without area
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
