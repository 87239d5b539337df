//! Pipeline configuration
//!
//! [`OmrConfig`] gathers the options of every stage so a deployment can be
//! described by one JSON document. Missing sections and fields take their
//! defaults.

use crate::breaker::BreakerConfig;
use crate::raster::RasterOptions;
use crate::{OmrError, OmrResult};
use bubblemark_recog::{AlignOptions, BarcodeScanOptions, CalibrationOptions, DetectionOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Orchestration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Bound on one template fetch; 0 disables the bound
    pub template_timeout_ms: u64,
    /// Bound on one downstream submission; 0 disables the bound
    pub submission_timeout_ms: u64,
    /// Process pages on the rayon pool
    pub parallel_pages: bool,
    /// Render an overlay image for every detected page
    pub visualize: bool,
    /// Breaker name used for the attendance sink
    pub sink_service: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            template_timeout_ms: 5_000,
            submission_timeout_ms: 5_000,
            parallel_pages: true,
            visualize: true,
            sink_service: "attendance-service".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn template_timeout(&self) -> Option<Duration> {
        (self.template_timeout_ms > 0).then(|| Duration::from_millis(self.template_timeout_ms))
    }

    pub fn submission_timeout(&self) -> Option<Duration> {
        (self.submission_timeout_ms > 0).then(|| Duration::from_millis(self.submission_timeout_ms))
    }
}

/// Configuration of the whole pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OmrConfig {
    pub raster: RasterOptions,
    pub barcode: BarcodeScanOptions,
    pub calibration: CalibrationOptions,
    pub align: AlignOptions,
    pub detection: DetectionOptions,
    pub pipeline: PipelineOptions,
    pub breaker: BreakerConfig,
}

impl OmrConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> OmrResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OmrError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> OmrResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OmrError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> OmrResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OmrError::Config(e.to_string()))
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> OmrResult<()> {
        let t = self.detection.fill_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(OmrError::Config(format!(
                "fill_threshold must lie in [0, 1], got {}",
                t
            )));
        }
        if !(self.detection.default_radius_ratio > 0.0) {
            return Err(OmrError::Config(
                "default_radius_ratio must be positive".to_string(),
            ));
        }
        if !(self.raster.target_dpi > 0.0) {
            return Err(OmrError::Config("target_dpi must be positive".to_string()));
        }
        if self.breaker.failure_threshold == 0 || self.breaker.success_threshold == 0 {
            return Err(OmrError::Config(
                "breaker thresholds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
