//! What a processing run reports back

use crate::jobs::ProcessingJob;
use crate::sink::AttendanceRecord;
use crate::OmrResult;
use bubblemark_core::{ImageFormat, Pix};
use bubblemark_recog::BubbleDetectionResult;
use bubblemark_sheet::DecodedIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing states, job-wide and per page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessingState {
    Received,
    Rasterized { pages: usize },
    Identified { page: usize },
    TemplateFetched { page: usize },
    Aligned { page: usize },
    Detected { page: usize },
    PageFailed { page: usize, reason: String },
    Aggregated,
    Submitted,
    Done,
    Failed { reason: String },
}

/// A state entered at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    #[serde(flatten)]
    pub state: ProcessingState,
    pub at: DateTime<Utc>,
}

impl StateTransition {
    /// Stamp and log a state change of job `job_id`
    pub(crate) fn enter(job_id: &str, state: ProcessingState) -> Self {
        match &state {
            ProcessingState::PageFailed { .. } | ProcessingState::Failed { .. } => {
                tracing::warn!(job_id, state = ?state, "state transition")
            }
            _ => tracing::debug!(job_id, state = ?state, "state transition"),
        }
        Self {
            state,
            at: Utc::now(),
        }
    }
}

/// How one page ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Detected,
    Failed { kind: String, reason: String },
    /// Not processed because the job was cancelled
    Skipped,
}

/// Result of one page
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// 0-based position in the uploaded document
    pub page_index: usize,
    pub identifier: Option<DecodedIdentifier>,
    /// Name of the detector used
    pub detector: Option<String>,
    pub outcome: PageOutcome,
    /// One entry per templated student, in row order; empty on failure
    pub results: Vec<BubbleDetectionResult>,
    #[serde(skip)]
    pub visualization: Option<Pix>,
}

impl PageReport {
    pub(crate) fn new(page_index: usize) -> Self {
        Self {
            page_index,
            identifier: None,
            detector: None,
            outcome: PageOutcome::Skipped,
            results: Vec::new(),
            visualization: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.outcome == PageOutcome::Detected
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PageOutcome::Failed { .. })
    }
}

/// Detection and submission counts of a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub total_students: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub attendance_percentage: f64,
    pub failed_pages: usize,
    /// Records accepted downstream
    pub success_count: usize,
    /// Records rejected by an open breaker without a call
    pub breaker_rejected_count: usize,
    /// Records whose call failed or timed out
    pub other_error_count: usize,
}

/// Everything a call to `process` produces
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub job: ProcessingJob,
    pub pages: Vec<PageReport>,
    pub records: Vec<AttendanceRecord>,
    pub summary: SubmissionSummary,
    pub transitions: Vec<StateTransition>,
}

impl ProcessingResult {
    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }

    /// Overlay of every page, `None` where the page was not detected
    pub fn visualizations(&self) -> Vec<Option<&Pix>> {
        self.pages.iter().map(|p| p.visualization.as_ref()).collect()
    }

    /// PNG encoding of a page overlay
    pub fn visualization_png(&self, page_index: usize) -> OmrResult<Option<Vec<u8>>> {
        match self
            .pages
            .get(page_index)
            .and_then(|p| p.visualization.as_ref())
        {
            Some(pix) => Ok(Some(bubblemark_io::write_image_mem(pix, ImageFormat::Png)?)),
            None => Ok(None),
        }
    }
}
