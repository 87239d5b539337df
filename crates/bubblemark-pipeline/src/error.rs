//! Error types for bubblemark-pipeline

use bubblemark_recog::RecogError;
use bubblemark_sheet::SheetError;
use thiserror::Error;

/// Errors raised while processing an uploaded document
#[derive(Debug, Error)]
pub enum OmrError {
    /// The upload could not be turned into page images
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Page identifier missing or malformed
    #[error("format error: {0}")]
    Format(String),

    /// Fewer than four usable calibration markers, or a degenerate frame
    #[error("calibration not found: {0}")]
    CalibrationNotFound(String),

    /// No templates stored for the decoded lecture and page
    #[error("no templates for lecture {lecture_id} page {page}")]
    TemplateNotFound { lecture_id: String, page: u32 },

    /// The attendance sink refused or failed a submission
    #[error("downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// A bounded call did not finish in time
    #[error("timed out: {0}")]
    Timeout(String),

    /// Processing was cancelled between pages
    #[error("processing cancelled")]
    Cancelled,

    /// Recognition failure other than calibration
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Template or job store failure
    #[error("store error: {0}")]
    Store(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl OmrError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Conversion(_) => "conversion",
            Self::Format(_) => "format",
            Self::CalibrationNotFound(_) => "calibration_not_found",
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::DownstreamUnavailable(_) => "downstream_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Recognition(_) => "recognition",
            Self::Store(_) => "store",
            Self::Config(_) => "config",
        }
    }
}

impl From<RecogError> for OmrError {
    fn from(e: RecogError) -> Self {
        match e {
            RecogError::CalibrationNotFound(msg) | RecogError::DegenerateFrame(msg) => {
                Self::CalibrationNotFound(msg)
            }
            RecogError::Barcode(msg) | RecogError::Format(msg) => Self::Format(msg),
            other => Self::Recognition(other.to_string()),
        }
    }
}

impl From<SheetError> for OmrError {
    fn from(e: SheetError) -> Self {
        match e {
            SheetError::Format(msg) => Self::Format(msg),
            SheetError::Store(msg) => Self::Store(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<bubblemark_io::IoError> for OmrError {
    fn from(e: bubblemark_io::IoError) -> Self {
        Self::Conversion(e.to_string())
    }
}

/// Result type for pipeline operations
pub type OmrResult<T> = Result<T, OmrError>;
