//! bubblemark-pipeline - From scanned uploads to attendance records
//!
//! - [`raster`]: document decoding and resolution normalization
//! - [`pipeline`]: per-page identification, alignment and detection
//! - [`breaker`], [`timeout`]: protection of downstream calls
//! - [`sink`], [`jobs`]: attendance submission and job persistence
//! - [`config`]: one JSON document configuring every stage
//!
//! # Examples
//!
//! ```no_run
//! use bubblemark_pipeline::{MemorySink, OmrPipeline};
//! use bubblemark_sheet::InMemoryTemplateStore;
//! use std::sync::Arc;
//!
//! let templates = Arc::new(InMemoryTemplateStore::new());
//! let sink = Arc::new(MemorySink::new());
//! let pipeline = OmrPipeline::builder(templates, sink.clone()).build().unwrap();
//!
//! let upload = std::fs::read("scan.tiff").unwrap();
//! let result = pipeline.process(&upload).unwrap();
//! println!("{}: {}% present", result.job_id(), result.summary.attendance_percentage);
//! ```

pub mod breaker;
pub mod config;
mod error;
pub mod jobs;
pub mod pipeline;
pub mod raster;
pub mod report;
pub mod sink;
pub mod timeout;

pub use breaker::{
    BreakerConfig, BreakerError, BreakerRegistry, BreakerState, BreakerStats, CircuitBreaker,
    Clock, ManualClock, SystemClock,
};
pub use config::{OmrConfig, PipelineOptions};
pub use error::{OmrError, OmrResult};
pub use jobs::{
    InMemoryJobStore, JobStatus, JobStore, JsonLinesJobStore, ProcessingJob,
    attendance_percentage, new_job_id,
};
pub use pipeline::{CancellationToken, OmrPipeline, OmrPipelineBuilder};
pub use raster::{ImageDocumentSource, PageSource, RasterOptions, Rasterizer};
pub use report::{
    PageOutcome, PageReport, ProcessingResult, ProcessingState, StateTransition,
    SubmissionSummary,
};
pub use sink::{AttendanceRecord, AttendanceSink, AttendanceStatus, MemorySink};
pub use timeout::run_bounded;
