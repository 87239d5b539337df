//! The scan-to-attendance orchestrator
//!
//! One call to [`OmrPipeline::process`] takes an uploaded document through
//!
//! ```text
//! received -> rasterized -> per page: identified -> template fetched
//!          -> aligned -> detected -> aggregated -> submitted -> done
//! ```
//!
//! Pages are independent and run on the rayon pool. A page that fails is
//! reported with its reason and contributes no students; the job goes on.
//! Only a document that cannot be rasterized, a cancellation or a failing
//! job store fail the whole job.

use crate::breaker::{BreakerError, BreakerRegistry};
use crate::config::OmrConfig;
use crate::jobs::{
    InMemoryJobStore, JobStatus, JobStore, ProcessingJob, attendance_percentage, new_job_id,
};
use crate::raster::{ImageDocumentSource, PageSource, Rasterizer};
use crate::report::{
    PageOutcome, PageReport, ProcessingResult, ProcessingState, StateTransition,
    SubmissionSummary,
};
use crate::sink::{AttendanceRecord, AttendanceSink, AttendanceStatus};
use crate::timeout::run_bounded;
use crate::{OmrError, OmrResult};
use bubblemark_core::Pix;
use bubblemark_recog::{
    ExpectedBubble, align_page, read_page_barcode, render_overlay, select_detector,
};
use bubblemark_sheet::{BubbleTemplate, IdentifierCodec, TemplateStore};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag, checked between pages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builder for [`OmrPipeline`]
pub struct OmrPipelineBuilder {
    config: OmrConfig,
    templates: Arc<dyn TemplateStore>,
    sink: Arc<dyn AttendanceSink>,
    codec: Option<IdentifierCodec>,
    jobs: Option<Arc<dyn JobStore>>,
    breakers: Option<Arc<BreakerRegistry>>,
    source: Option<Arc<dyn PageSource>>,
}

impl OmrPipelineBuilder {
    pub fn config(mut self, config: OmrConfig) -> Self {
        self.config = config;
        self
    }

    /// Codec whose registry resolves page identifiers
    pub fn codec(mut self, codec: IdentifierCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn job_store(mut self, jobs: Arc<dyn JobStore>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn breakers(mut self, breakers: Arc<BreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> OmrResult<OmrPipeline> {
        self.config.validate()?;
        let breakers = self
            .breakers
            .unwrap_or_else(|| Arc::new(BreakerRegistry::new(self.config.breaker.clone())));
        let source = self.source.unwrap_or_else(|| Arc::new(ImageDocumentSource));
        Ok(OmrPipeline {
            rasterizer: Rasterizer::new(source, self.config.raster.clone()),
            config: self.config,
            codec: self.codec.unwrap_or_default(),
            templates: self.templates,
            sink: self.sink,
            jobs: self
                .jobs
                .unwrap_or_else(|| Arc::new(InMemoryJobStore::new())),
            breakers,
        })
    }
}

/// Scan-to-attendance pipeline
pub struct OmrPipeline {
    config: OmrConfig,
    rasterizer: Rasterizer,
    codec: IdentifierCodec,
    templates: Arc<dyn TemplateStore>,
    sink: Arc<dyn AttendanceSink>,
    jobs: Arc<dyn JobStore>,
    breakers: Arc<BreakerRegistry>,
}

impl std::fmt::Debug for OmrPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmrPipeline")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

struct PageRun {
    report: PageReport,
    transitions: Vec<StateTransition>,
}

impl OmrPipeline {
    /// Start building a pipeline around a template store and a sink
    pub fn builder(
        templates: Arc<dyn TemplateStore>,
        sink: Arc<dyn AttendanceSink>,
    ) -> OmrPipelineBuilder {
        OmrPipelineBuilder {
            config: OmrConfig::default(),
            templates,
            sink,
            codec: None,
            jobs: None,
            breakers: None,
            source: None,
        }
    }

    pub fn config(&self) -> &OmrConfig {
        &self.config
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn job_store(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Process an uploaded document.
    pub fn process(&self, document: &[u8]) -> OmrResult<ProcessingResult> {
        self.process_with_cancel(document, &CancellationToken::new())
    }

    /// Process an uploaded document, stopping between pages once `cancel`
    /// is set.
    ///
    /// # Errors
    ///
    /// - [`OmrError::Conversion`] if the document cannot be rasterized.
    /// - [`OmrError::Cancelled`] if cancellation was requested.
    /// - [`OmrError::Store`] if the job record cannot be persisted.
    ///
    /// A job record with status `failed` is persisted for the first two.
    pub fn process_with_cancel(
        &self,
        document: &[u8],
        cancel: &CancellationToken,
    ) -> OmrResult<ProcessingResult> {
        let job_id = new_job_id();
        let created_at = Utc::now();
        let mut transitions = vec![StateTransition::enter(&job_id, ProcessingState::Received)];
        tracing::info!(job_id = %job_id, bytes = document.len(), "processing upload");

        let pages = match self.rasterizer.rasterize(document) {
            Ok(pages) => pages,
            Err(e) => return Err(self.fail_job(&job_id, created_at, 0, &mut transitions, e)),
        };
        transitions.push(StateTransition::enter(
            &job_id,
            ProcessingState::Rasterized { pages: pages.len() },
        ));

        let runs = self.run_pages(&job_id, &pages, cancel);
        if cancel.is_cancelled() {
            return Err(self.fail_job(
                &job_id,
                created_at,
                pages.len(),
                &mut transitions,
                OmrError::Cancelled,
            ));
        }

        let mut reports = Vec::with_capacity(runs.len());
        for run in runs {
            transitions.extend(run.transitions);
            reports.push(run.report);
        }

        let records = self.aggregate(&job_id, &reports);
        let total = records.len();
        let present = records.iter().filter(|r| r.is_present()).count();
        let mut summary = SubmissionSummary {
            total_students: total,
            present_count: present,
            absent_count: total - present,
            attendance_percentage: attendance_percentage(present, total),
            failed_pages: reports.iter().filter(|r| r.is_failed()).count(),
            ..Default::default()
        };
        transitions.push(StateTransition::enter(&job_id, ProcessingState::Aggregated));

        self.submit(&records, &mut summary);
        transitions.push(StateTransition::enter(&job_id, ProcessingState::Submitted));

        let status = if summary.total_students == 0 {
            JobStatus::NoResults
        } else if summary.breaker_rejected_count > 0 {
            JobStatus::CircuitBreakerOpen
        } else if summary.failed_pages > 0 || summary.other_error_count > 0 {
            JobStatus::PartialSuccess
        } else {
            JobStatus::Success
        };
        let job = ProcessingJob {
            job_id: job_id.clone(),
            lecture_id: reports
                .iter()
                .find_map(|r| r.identifier.as_ref().map(|id| id.lecture_id.clone())),
            total_pages: pages.len(),
            total_students: summary.total_students,
            present_count: summary.present_count,
            absent_count: summary.absent_count,
            attendance_percentage: summary.attendance_percentage,
            status,
            created_at,
        };
        self.jobs.save(&job)?;
        transitions.push(StateTransition::enter(&job_id, ProcessingState::Done));
        tracing::info!(
            job_id = %job_id,
            status = ?status,
            students = summary.total_students,
            present = summary.present_count,
            submitted = summary.success_count,
            rejected = summary.breaker_rejected_count,
            errors = summary.other_error_count,
            "job finished"
        );

        Ok(ProcessingResult {
            job,
            pages: reports,
            records,
            summary,
            transitions,
        })
    }

    fn fail_job(
        &self,
        job_id: &str,
        created_at: DateTime<Utc>,
        total_pages: usize,
        transitions: &mut Vec<StateTransition>,
        error: OmrError,
    ) -> OmrError {
        transitions.push(StateTransition::enter(
            job_id,
            ProcessingState::Failed {
                reason: error.to_string(),
            },
        ));
        let job = ProcessingJob {
            job_id: job_id.to_string(),
            lecture_id: None,
            total_pages,
            total_students: 0,
            present_count: 0,
            absent_count: 0,
            attendance_percentage: 0.0,
            status: JobStatus::Failed,
            created_at,
        };
        if let Err(e) = self.jobs.save(&job) {
            tracing::error!(job_id, error = %e, "failed to persist failed job");
        }
        tracing::error!(job_id, error = %error, "job failed");
        error
    }

    fn run_pages(&self, job_id: &str, pages: &[Pix], cancel: &CancellationToken) -> Vec<PageRun> {
        let run = |(index, pix): (usize, &Pix)| {
            if cancel.is_cancelled() {
                PageRun {
                    report: PageReport::new(index),
                    transitions: Vec::new(),
                }
            } else {
                self.process_page(job_id, index, pix)
            }
        };
        if self.config.pipeline.parallel_pages {
            // indexed collect keeps document order
            pages.par_iter().enumerate().map(run).collect()
        } else {
            let mut runs = Vec::with_capacity(pages.len());
            for item in pages.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                runs.push(run(item));
            }
            runs
        }
    }

    fn process_page(&self, job_id: &str, index: usize, pix: &Pix) -> PageRun {
        let mut report = PageReport::new(index);
        let mut transitions = Vec::new();
        match self.detect_page(job_id, index, pix, &mut report, &mut transitions) {
            Ok(()) => report.outcome = PageOutcome::Detected,
            Err(e) => {
                tracing::warn!(job_id, page = index, kind = e.kind(), reason = %e, "page failed");
                transitions.push(StateTransition::enter(
                    job_id,
                    ProcessingState::PageFailed {
                        page: index,
                        reason: e.to_string(),
                    },
                ));
                report.results.clear();
                report.visualization = None;
                report.outcome = PageOutcome::Failed {
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                };
            }
        }
        PageRun {
            report,
            transitions,
        }
    }

    fn detect_page(
        &self,
        job_id: &str,
        index: usize,
        pix: &Pix,
        report: &mut PageReport,
        transitions: &mut Vec<StateTransition>,
    ) -> OmrResult<()> {
        let payload = read_page_barcode(pix, &self.config.barcode)?;
        let id = self.codec.decode(&payload)?;
        if !id.mapped {
            tracing::warn!(job_id, page = index, hash = id.hash, "unregistered lecture hash");
        }
        report.identifier = Some(id.clone());
        transitions.push(StateTransition::enter(
            job_id,
            ProcessingState::Identified { page: index },
        ));

        let templates = self.fetch_templates(&id.lecture_id, id.page)?;
        if templates.is_empty() {
            return Err(OmrError::TemplateNotFound {
                lecture_id: id.lecture_id,
                page: id.page,
            });
        }
        transitions.push(StateTransition::enter(
            job_id,
            ProcessingState::TemplateFetched { page: index },
        ));

        let aligned = align_page(pix, &self.config.calibration, &self.config.align)?;
        transitions.push(StateTransition::enter(
            job_id,
            ProcessingState::Aligned { page: index },
        ));

        let expected: Vec<ExpectedBubble> =
            templates.iter().map(BubbleTemplate::expectation).collect();
        let detector = select_detector(&expected, &self.config.detection);
        let results = detector.detect(&aligned, &expected)?;
        tracing::debug!(
            job_id,
            page = index,
            detector = detector.name(),
            students = results.len(),
            "page detected"
        );
        report.detector = Some(detector.name().to_string());

        if self.config.pipeline.visualize {
            let ratio = expected
                .first()
                .and_then(|e| e.radius_ratio)
                .unwrap_or(self.config.detection.default_radius_ratio);
            match render_overlay(&aligned, &results, ratio * aligned.frame.width) {
                Ok(overlay) => report.visualization = Some(overlay),
                Err(e) => tracing::warn!(job_id, page = index, error = %e, "overlay failed"),
            }
        }
        report.results = results;
        transitions.push(StateTransition::enter(
            job_id,
            ProcessingState::Detected { page: index },
        ));
        Ok(())
    }

    fn fetch_templates(&self, lecture_id: &str, page: u32) -> OmrResult<Vec<BubbleTemplate>> {
        let store = Arc::clone(&self.templates);
        let lecture_id = lecture_id.to_string();
        run_bounded(
            "template-fetch",
            self.config.pipeline.template_timeout(),
            move || Ok(store.get_templates(&lecture_id, page)?),
        )
    }

    fn aggregate(&self, job_id: &str, reports: &[PageReport]) -> Vec<AttendanceRecord> {
        let now = Utc::now();
        reports
            .iter()
            .filter(|r| r.is_detected())
            .flat_map(|r| {
                let (lecture_id, page_number) = r
                    .identifier
                    .as_ref()
                    .map(|id| (id.lecture_id.clone(), id.page))
                    .unwrap_or_default();
                r.results.iter().map(move |b| AttendanceRecord {
                    lecture_id: lecture_id.clone(),
                    student_id: b.student_id.clone(),
                    student_name: b.student_name.clone(),
                    status: if b.is_filled {
                        AttendanceStatus::Present
                    } else {
                        AttendanceStatus::Absent
                    },
                    page_number,
                    fill_percentage: b.fill_percentage,
                    confidence: b.confidence,
                    job_id: job_id.to_string(),
                    recorded_at: now,
                })
            })
            .collect()
    }

    fn submit(&self, records: &[AttendanceRecord], summary: &mut SubmissionSummary) {
        let breaker = self.breakers.get(&self.config.pipeline.sink_service);
        let timeout = self.config.pipeline.submission_timeout();
        for record in records {
            let sink = Arc::clone(&self.sink);
            let rec = record.clone();
            let outcome =
                breaker.call(|| run_bounded("submission", timeout, move || sink.submit(&rec)));
            match outcome {
                Ok(()) => summary.success_count += 1,
                Err(BreakerError::Open) => summary.breaker_rejected_count += 1,
                Err(BreakerError::Inner(e)) => {
                    tracing::warn!(
                        student_id = %record.student_id,
                        error = %e,
                        "attendance submission failed"
                    );
                    summary.other_error_count += 1;
                }
            }
        }
    }
}
