//! Filter error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Core(#[from] bubblemark_core::Error),

    /// The operation accepts only `expected` input
    #[error("{expected} required, got {actual} bpp")]
    UnsupportedDepth { expected: &'static str, actual: u32 },

    /// Window sizes or thresholds out of range
    #[error("bad filter parameters: {0}")]
    InvalidParameters(String),
}

pub type FilterResult<T> = Result<T, FilterError>;
