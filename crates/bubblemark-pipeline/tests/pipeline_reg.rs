//! End-to-end pipeline regression test
//!
//! Generates sheets, prints them at 150 DPI, marks them like students would
//! and feeds the scans through the whole pipeline: rasterization, page
//! identification, template lookup, alignment, detection, aggregation and
//! submission.

use bubblemark_core::{Pix, Point};
use bubblemark_pipeline::{
    AttendanceRecord, AttendanceSink, CancellationToken, JobStatus, JobStore, JsonLinesJobStore,
    MemorySink, OmrConfig, OmrError, OmrPipeline, OmrResult, PageOutcome, PageReport,
    ProcessingResult, ProcessingState, RasterOptions,
};
use bubblemark_sheet::{
    BubbleTemplate, IdentifierCodec, InMemoryTemplateStore, LectureIdentifier, SheetDocument,
    SheetGenerator, SheetLayout, SheetResult, Student, TemplateStore,
};
use bubblemark_test::RegParams;
use bubblemark_test::fixtures::{
    fill_bubble, jpeg_document, perspective_distort, png_document, pnm_document, tiff_document,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DPI: f64 = 150.0;

struct Fixture {
    codec: IdentifierCodec,
    doc: SheetDocument,
    pages: Vec<Pix>,
    templates: Arc<InMemoryTemplateStore>,
}

fn fixture(lecture_id: &str, students: usize) -> Fixture {
    let generator =
        SheetGenerator::new(SheetLayout::default(), IdentifierCodec::default()).expect("generator");
    let roster: Vec<Student> = (1..=students)
        .map(|i| Student::new(format!("2024{:04}", i), format!("Student {}", i)))
        .collect();
    let doc = generator
        .generate(&LectureIdentifier::new(lecture_id), &roster)
        .expect("generate");
    let templates = Arc::new(InMemoryTemplateStore::new());
    doc.save_templates(templates.as_ref()).expect("save templates");
    let pages = doc.render(DPI).expect("render");
    Fixture {
        codec: generator.codec().clone(),
        doc,
        pages,
        templates,
    }
}

fn config() -> OmrConfig {
    let mut config = OmrConfig::default();
    config.raster = RasterOptions::default()
        .with_target_dpi(DPI)
        .with_min_dpi(DPI);
    config
}

/// Mark the bubble of `row` (0-based) on `page` (0-based)
fn mark(fx: &Fixture, pix: &Pix, page: usize, row: usize) -> Pix {
    let t = &fx.doc.pages[page].templates[row];
    let s = DPI / 72.0;
    fill_bubble(
        pix,
        Point::new(t.bubble_x * s, t.bubble_y * s),
        t.bubble_radius * s,
    )
}

fn pipeline(fx: &Fixture, sink: Arc<dyn AttendanceSink>) -> OmrPipeline {
    OmrPipeline::builder(fx.templates.clone(), sink)
        .config(config())
        .codec(fx.codec.clone())
        .build()
        .expect("pipeline")
}

fn failed_with(page: &PageReport, expected: &str) -> bool {
    matches!(&page.outcome, PageOutcome::Failed { kind, .. } if kind == expected)
}

#[derive(Default)]
struct DownSink {
    calls: AtomicUsize,
}

impl AttendanceSink for DownSink {
    fn submit(&self, _record: &AttendanceRecord) -> OmrResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OmrError::DownstreamUnavailable("503 service unavailable".into()))
    }
}

struct SlowStore {
    inner: Arc<InMemoryTemplateStore>,
    delay: Duration,
}

impl TemplateStore for SlowStore {
    fn get_templates(&self, lecture_id: &str, page_number: u32) -> SheetResult<Vec<BubbleTemplate>> {
        std::thread::sleep(self.delay);
        self.inner.get_templates(lecture_id, page_number)
    }

    fn save_templates(&self, templates: &[BubbleTemplate]) -> SheetResult<()> {
        self.inner.save_templates(templates)
    }
}

#[test]
fn pipeline_reg_upload_formats() {
    let mut rp = RegParams::new("pipeline_formats");

    let fx = fixture("CS101-L07", 3);
    let scan = mark(&fx, &fx.pages[0], 0, 1);
    let pipeline = pipeline(&fx, Arc::new(MemorySink::new()));

    for (name, upload) in [
        ("jpeg", jpeg_document(&scan).expect("jpeg")),
        ("pnm", pnm_document(&scan).expect("pnm")),
    ] {
        let result = pipeline.process(&upload).expect("process");
        rp.check(result.job.status == JobStatus::Success, name);
        rp.compare_values(3.0, result.summary.total_students as f64, 0.0);
        let present: Vec<bool> = result.pages[0].results.iter().map(|r| r.is_filled).collect();
        rp.compare_marks(&[false, true, false], &present);
    }

    assert!(rp.cleanup(), "pipeline upload format regression test failed");
}

#[test]
fn pipeline_reg_single_page() {
    let mut rp = RegParams::new("pipeline_single");

    let fx = fixture("CS101-L01", 2);
    let scan = mark(&fx, &fx.pages[0], 0, 0);
    rp.write_pix(&scan, "scan").expect("write scan");
    let sink = Arc::new(MemorySink::new());
    let pipeline = pipeline(&fx, sink.clone());

    let result = pipeline
        .process(&png_document(&scan).expect("png"))
        .expect("process");
    rp.check(result.job.status == JobStatus::Success, "status success");
    rp.compare_values(2.0, result.summary.total_students as f64, 0.0);
    rp.compare_values(1.0, result.summary.present_count as f64, 0.0);
    rp.compare_values(1.0, result.summary.absent_count as f64, 0.0);
    rp.compare_values(50.0, result.summary.attendance_percentage, 0.0);
    rp.compare_values(2.0, result.summary.success_count as f64, 0.0);
    rp.compare_strings(b"CS101-L01", result.job.lecture_id.as_deref().unwrap_or("").as_bytes());

    let page = &result.pages[0];
    rp.compare_strings(b"template", page.detector.as_deref().unwrap_or("").as_bytes());
    rp.check(page.identifier.as_ref().is_some_and(|id| id.mapped), "lecture hash mapped");

    let records = sink.records();
    rp.compare_values(2.0, records.len() as f64, 0.0);
    rp.compare_strings(b"20240001", records[0].student_id.as_bytes());
    rp.check(records[0].is_present(), "student 1 present");
    rp.check(!records[1].is_present(), "student 2 absent");
    rp.compare_values(1.0, records[0].fill_percentage, 0.05);
    rp.compare_strings(result.job_id().as_bytes(), records[1].job_id.as_bytes());

    // the overlay is kept and encodes
    let png = result.visualization_png(0).expect("overlay png");
    rp.check(png.is_some_and(|b| b.starts_with(b"\x89PNG")), "overlay png");

    let states: Vec<&ProcessingState> = result.transitions.iter().map(|t| &t.state).collect();
    rp.check(states.first() == Some(&&ProcessingState::Received), "starts received");
    rp.check(states.last() == Some(&&ProcessingState::Done), "ends done");
    rp.check(states.contains(&&ProcessingState::Rasterized { pages: 1 }), "rasterized");
    rp.check(states.contains(&&ProcessingState::Detected { page: 0 }), "page detected");

    let stored = pipeline
        .job_store()
        .get(result.job_id())
        .expect("job store")
        .expect("job persisted");
    rp.compare_values(50.0, stored.attendance_percentage, 0.0);

    assert!(rp.cleanup(), "pipeline single page regression test failed");
}

#[test]
fn pipeline_reg_multipage_and_distortion() {
    let mut rp = RegParams::new("pipeline_multipage");

    // 34 students span two pages; student 33 is row 3 of page 2
    let fx = fixture("CS102-L07", 34);
    let first = mark(&fx, &fx.pages[0], 0, 4);
    let second = mark(&fx, &fx.pages[1], 1, 2);
    let second = perspective_distort(&second, [(9.0, 6.0), (4.0, 10.0), (6.0, 3.0), (10.0, 7.0)])
        .expect("distort");
    rp.write_pix(&second, "distorted").expect("write distorted");
    let upload = tiff_document(&[first, second]).expect("tiff");

    let sink = Arc::new(MemorySink::new());
    let result = pipeline(&fx, sink.clone()).process(&upload).expect("process");
    rp.check(result.job.status == JobStatus::Success, "status success");
    rp.compare_values(2.0, result.job.total_pages as f64, 0.0);
    rp.compare_values(34.0, result.summary.total_students as f64, 0.0);
    rp.compare_values(2.0, result.summary.present_count as f64, 0.0);
    rp.compare_values(5.88, result.summary.attendance_percentage, 0.0);

    // document order is kept
    let pages: Vec<u32> = result
        .pages
        .iter()
        .filter_map(|p| p.identifier.as_ref().map(|id| id.page))
        .collect();
    rp.check(pages == vec![1, 2], "page order");
    let present: Vec<&str> = result
        .records
        .iter()
        .filter(|r| r.is_present())
        .map(|r| r.student_id.as_str())
        .collect();
    rp.check(present == vec!["20240005", "20240033"], "present students");
    rp.compare_values(2.0, result.records[32].page_number as f64, 0.0);
    rp.compare_values(34.0, sink.records().len() as f64, 0.0);

    assert!(rp.cleanup(), "pipeline multipage regression test failed");
}

#[test]
fn pipeline_reg_page_failures() {
    let mut rp = RegParams::new("pipeline_failures");

    let fx = fixture("CS103-L02", 3);

    // --- unregistered lecture hash ---
    let sink = Arc::new(MemorySink::new());
    let stranger = OmrPipeline::builder(fx.templates.clone(), sink.clone())
        .config(config())
        .codec(IdentifierCodec::default())
        .build()
        .expect("pipeline");
    let upload = png_document(&fx.pages[0]).expect("png");
    let result = stranger.process(&upload).expect("process");
    let page = &result.pages[0];
    let id = page.identifier.as_ref().expect("identifier decoded");
    rp.check(!id.mapped, "hash unmapped");
    rp.check(id.lecture_id.starts_with("LEC-"), "synthetic lecture id");
    rp.check(failed_with(page, "template_not_found"), "template not found");
    rp.check(result.job.status == JobStatus::NoResults, "status no_results");
    rp.compare_values(0.0, sink.records().len() as f64, 0.0);

    // --- a page without barcode next to a good one ---
    let blank = Pix::new_filled(
        fx.pages[0].width(),
        fx.pages[0].height(),
        fx.pages[0].depth(),
        255,
    )
    .expect("blank");
    let upload = tiff_document(&[blank, fx.pages[0].clone()]).expect("tiff");
    let result = pipeline(&fx, Arc::new(MemorySink::new()))
        .process(&upload)
        .expect("process");
    rp.check(failed_with(&result.pages[0], "format"), "blank page format error");
    rp.check(result.pages[1].is_detected(), "good page detected");
    rp.compare_values(1.0, result.summary.failed_pages as f64, 0.0);
    rp.compare_values(3.0, result.summary.total_students as f64, 0.0);
    rp.check(result.job.status == JobStatus::PartialSuccess, "status partial_success");
    let page_failed = result
        .transitions
        .iter()
        .any(|t| matches!(t.state, ProcessingState::PageFailed { page: 0, .. }));
    rp.check(page_failed, "page failure logged");

    // --- identifiable page with its markers torn off ---
    let mut pm = fx.pages[0].to_mut();
    let px_per_mm = DPI / 25.4;
    pm.fill_rect(
        145.0 * px_per_mm,
        0.0,
        pm.width() as f64,
        pm.height() as f64,
        255,
    );
    let torn: Pix = pm.into();
    let result = pipeline(&fx, Arc::new(MemorySink::new()))
        .process(&png_document(&torn).expect("png"))
        .expect("process");
    rp.check(
        failed_with(&result.pages[0], "calibration_not_found"),
        "calibration not found",
    );
    rp.check(result.pages[0].visualization.is_none(), "no overlay for failed page");

    // --- template store slower than its budget ---
    let slow = Arc::new(SlowStore {
        inner: fx.templates.clone(),
        delay: Duration::from_millis(400),
    });
    let mut cfg = config();
    cfg.pipeline.template_timeout_ms = 50;
    let result = OmrPipeline::builder(slow, Arc::new(MemorySink::new()))
        .config(cfg)
        .codec(fx.codec.clone())
        .build()
        .expect("pipeline")
        .process(&upload_of(&fx.pages[0]))
        .expect("process");
    rp.check(failed_with(&result.pages[0], "timeout"), "template fetch timed out");

    // --- unreadable upload fails the job ---
    let pipeline = pipeline(&fx, Arc::new(MemorySink::new()));
    let err = pipeline.process(b"not a scan");
    rp.check(matches!(err, Err(OmrError::Conversion(_))), "conversion error");
    let jobs = pipeline.job_store().list().expect("jobs");
    rp.check(jobs.len() == 1 && jobs[0].status == JobStatus::Failed, "failed job persisted");

    assert!(rp.cleanup(), "pipeline failure regression test failed");
}

fn upload_of(pix: &Pix) -> Vec<u8> {
    png_document(pix).expect("png")
}

#[test]
fn pipeline_reg_downstream_outage() {
    let mut rp = RegParams::new("pipeline_outage");

    let fx = fixture("CS104-L03", 5);
    let sink = Arc::new(DownSink::default());
    let result = pipeline(&fx, sink.clone())
        .process(&upload_of(&fx.pages[0]))
        .expect("process");

    // three failures open the breaker; the rest are rejected without a call
    rp.compare_values(3.0, sink.calls.load(Ordering::SeqCst) as f64, 0.0);
    rp.compare_values(3.0, result.summary.other_error_count as f64, 0.0);
    rp.compare_values(2.0, result.summary.breaker_rejected_count as f64, 0.0);
    rp.compare_values(0.0, result.summary.success_count as f64, 0.0);
    rp.compare_values(5.0, result.summary.total_students as f64, 0.0);
    rp.check(result.job.status == JobStatus::CircuitBreakerOpen, "status circuit_breaker_open");

    assert!(rp.cleanup(), "pipeline outage regression test failed");
}

#[test]
fn pipeline_reg_determinism_and_jobs() {
    let mut rp = RegParams::new("pipeline_jobs");

    let fx = fixture("CS105-L04", 6);
    let scan = mark(&fx, &fx.pages[0], 0, 1);
    let scan = mark(&fx, &scan, 0, 4);
    let upload = upload_of(&scan);

    let dir = tempfile::tempdir().expect("tempdir");
    let jobs: Arc<dyn JobStore> = Arc::new(JsonLinesJobStore::new(dir.path().join("jobs.jsonl")));

    let mut sequential_cfg = config();
    sequential_cfg.pipeline.parallel_pages = false;
    sequential_cfg.pipeline.visualize = false;
    let parallel = OmrPipeline::builder(fx.templates.clone(), Arc::new(MemorySink::new()))
        .config(config())
        .codec(fx.codec.clone())
        .job_store(jobs.clone())
        .build()
        .expect("pipeline");
    let sequential = OmrPipeline::builder(fx.templates.clone(), Arc::new(MemorySink::new()))
        .config(sequential_cfg)
        .codec(fx.codec.clone())
        .job_store(jobs.clone())
        .build()
        .expect("pipeline");

    let a = parallel.process(&upload).expect("first run");
    let b = sequential.process(&upload).expect("second run");
    let fills = |r: &ProcessingResult| -> Vec<(String, bool, f64)> {
        r.records
            .iter()
            .map(|x| (x.student_id.clone(), x.is_present(), x.fill_percentage))
            .collect()
    };
    rp.check(fills(&a) == fills(&b), "parallel and sequential agree");
    rp.compare_values(33.33, a.summary.attendance_percentage, 0.0);
    rp.check(a.job_id() != b.job_id(), "fresh job ids");
    rp.check(b.pages[0].visualization.is_none(), "overlay disabled");

    let listed = jobs.list().expect("list jobs");
    rp.compare_values(2.0, listed.len() as f64, 0.0);
    rp.compare_strings(a.job_id().as_bytes(), listed[0].job_id.as_bytes());

    // --- cancellation before any page ---
    let token = CancellationToken::new();
    token.cancel();
    let err = parallel.process_with_cancel(&upload, &token);
    rp.check(matches!(err, Err(OmrError::Cancelled)), "cancelled");
    let listed = jobs.list().expect("list jobs");
    rp.compare_values(3.0, listed.len() as f64, 0.0);
    rp.check(listed[2].status == JobStatus::Failed, "cancelled job persisted as failed");

    assert!(rp.cleanup(), "pipeline jobs regression test failed");
}
