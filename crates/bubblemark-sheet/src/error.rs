//! Error types for bubblemark-sheet

use thiserror::Error;

/// Errors raised while generating sheets or handling their templates
#[derive(Debug, Error)]
pub enum SheetError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] bubblemark_core::Error),

    /// Document output error
    #[error("io error: {0}")]
    Io(#[from] bubblemark_io::IoError),

    /// A sheet needs at least one student
    #[error("student list is empty")]
    EmptyRoster,

    /// Two roster entries share a student id
    #[error("duplicate student id {0:?} in roster")]
    DuplicateStudent(String),

    /// Layout parameters that do not fit on the page
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Page identifier with the wrong shape
    #[error("format error: {0}")]
    Format(String),

    /// Template store failure
    #[error("template store error: {0}")]
    Store(String),
}

/// Result type for sheet operations
pub type SheetResult<T> = Result<T, SheetError>;
