//! Processing job records
//!
//! Every upload ends in exactly one persisted [`ProcessingJob`]. Jobs are
//! terminal once written: a store refuses a second record with the same id.

use crate::{OmrError, OmrResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Final status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Every page detected and every record submitted
    Success,
    /// Some pages failed or some submissions errored
    PartialSuccess,
    /// Submissions were rejected by an open breaker
    CircuitBreakerOpen,
    /// No page contributed any student
    NoResults,
    /// The job could not run to completion
    Failed,
}

/// Summary record of one upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub job_id: String,
    pub lecture_id: Option<String>,
    pub total_pages: usize,
    pub total_students: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub attendance_percentage: f64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Fresh job id: `JOB-` and 12 uppercase hex digits
pub fn new_job_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("JOB-{}", hex[..12].to_uppercase())
}

/// `present / total * 100` rounded to two decimals; 0 without students
pub fn attendance_percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// Persistence of processing jobs
pub trait JobStore: Send + Sync {
    fn save(&self, job: &ProcessingJob) -> OmrResult<()>;
    fn get(&self, job_id: &str) -> OmrResult<Option<ProcessingJob>>;
    /// All jobs in the order they were saved
    fn list(&self) -> OmrResult<Vec<ProcessingJob>>;
}

fn already_written(job_id: &str) -> OmrError {
    OmrError::Store(format!("job {} is already persisted", job_id))
}

/// In-process job store
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<Vec<ProcessingJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn save(&self, job: &ProcessingJob) -> OmrResult<()> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| OmrError::Store("job store lock poisoned".to_string()))?;
        if jobs.iter().any(|j| j.job_id == job.job_id) {
            return Err(already_written(&job.job_id));
        }
        jobs.push(job.clone());
        Ok(())
    }

    fn get(&self, job_id: &str) -> OmrResult<Option<ProcessingJob>> {
        Ok(self.list()?.into_iter().find(|j| j.job_id == job_id))
    }

    fn list(&self) -> OmrResult<Vec<ProcessingJob>> {
        Ok(self
            .jobs
            .read()
            .map_err(|_| OmrError::Store("job store lock poisoned".to_string()))?
            .clone())
    }
}

/// Job store appending one JSON object per line to a file
#[derive(Debug)]
pub struct JsonLinesJobStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesJobStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> OmrResult<Vec<ProcessingJob>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| OmrError::Store(e.to_string()))?;
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    OmrError::Store(format!("{} line {}: {}", self.path.display(), i + 1, e))
                })
            })
            .collect()
    }
}

impl JobStore for JsonLinesJobStore {
    fn save(&self, job: &ProcessingJob) -> OmrResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.read_all()?.iter().any(|j| j.job_id == job.job_id) {
            return Err(already_written(&job.job_id));
        }
        let line = serde_json::to_string(job).map_err(|e| OmrError::Store(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| OmrError::Store(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| OmrError::Store(e.to_string()))?;
        Ok(())
    }

    fn get(&self, job_id: &str) -> OmrResult<Option<ProcessingJob>> {
        Ok(self.list()?.into_iter().find(|j| j.job_id == job_id))
    }

    fn list(&self) -> OmrResult<Vec<ProcessingJob>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, status: JobStatus) -> ProcessingJob {
        ProcessingJob {
            job_id: id.to_string(),
            lecture_id: Some("LEC-1".to_string()),
            total_pages: 1,
            total_students: 3,
            present_count: 2,
            absent_count: 1,
            attendance_percentage: attendance_percentage(2, 3),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_job_id_shape() {
        let id = new_job_id();
        assert_eq!(id.len(), 16);
        assert!(id.starts_with("JOB-"));
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(id, new_job_id());
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(attendance_percentage(2, 3), 66.67);
        assert_eq!(attendance_percentage(1, 2), 50.0);
        assert_eq!(attendance_percentage(0, 0), 0.0);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::CircuitBreakerOpen).unwrap();
        assert_eq!(json, "\"circuit_breaker_open\"");
    }

    fn exercise(store: &dyn JobStore) {
        store.save(&job("JOB-1", JobStatus::Success)).unwrap();
        store.save(&job("JOB-2", JobStatus::NoResults)).unwrap();
        assert!(matches!(
            store.save(&job("JOB-1", JobStatus::Failed)),
            Err(OmrError::Store(_))
        ));
        let got = store.get("JOB-1").unwrap().unwrap();
        assert_eq!(got.status, JobStatus::Success);
        assert!(store.get("JOB-9").unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryJobStore::new());
    }

    #[test]
    fn test_json_lines_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.jsonl");
        exercise(&JsonLinesJobStore::new(&path));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"status\":\"no_results\""));
    }
}
