//! Downstream attendance submission

use crate::{OmrError, OmrResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Attendance outcome of one student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// One record sent downstream per detected student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub lecture_id: String,
    pub student_id: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub page_number: u32,
    pub fill_percentage: f64,
    pub confidence: f64,
    pub job_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

/// Receiver of attendance records, such as an attendance service client
pub trait AttendanceSink: Send + Sync {
    /// Deliver one record. Failures should be reported as
    /// [`OmrError::DownstreamUnavailable`].
    fn submit(&self, record: &AttendanceRecord) -> OmrResult<()>;
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AttendanceSink for MemorySink {
    fn submit(&self, record: &AttendanceRecord) -> OmrResult<()> {
        self.records
            .lock()
            .map_err(|_| OmrError::DownstreamUnavailable("sink lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}
