//! Region error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error(transparent)]
    Core(#[from] bubblemark_core::Error),

    /// Labeling runs on binary images only
    #[error("connected components need a {expected} image, got {actual} bpp")]
    UnsupportedDepth { expected: &'static str, actual: u32 },
}

pub type RegionResult<T> = Result<T, RegionError>;
