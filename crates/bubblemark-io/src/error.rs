//! Error types for bubblemark-io

use thiserror::Error;

/// Errors raised while decoding or encoding images and documents
#[derive(Debug, Error)]
pub enum IoError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] bubblemark_core::Error),

    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed image data
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoder failure
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Format not recognized or not compiled in
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid caller-supplied data
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The document could not be turned into page images
    #[error("conversion failed: {0}")]
    Conversion(String),
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;
