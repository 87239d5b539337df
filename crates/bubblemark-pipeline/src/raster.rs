//! Turning uploaded documents into page images
//!
//! A [`PageSource`] decodes the upload; the [`Rasterizer`] then normalizes
//! every page to 8 bpp grayscale at the target resolution. Pages whose
//! resolution is unknown are passed through at their native size.

use crate::{OmrError, OmrResult};
use bubblemark_core::pix::convert::convert_to_gray;
use bubblemark_core::Pix;
use bubblemark_transform::{ScaleMethod, scale};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rasterization options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    /// Resolution pages are normalized to
    pub target_dpi: f64,
    /// Pages scanned below this resolution are processed with a warning
    pub min_dpi: f64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            target_dpi: 300.0,
            min_dpi: 300.0,
        }
    }
}

impl RasterOptions {
    pub fn with_target_dpi(mut self, dpi: f64) -> Self {
        self.target_dpi = dpi;
        self
    }

    pub fn with_min_dpi(mut self, dpi: f64) -> Self {
        self.min_dpi = dpi;
        self
    }
}

/// Decoder from document bytes to page images, in document order
pub trait PageSource: Send + Sync {
    fn pages(&self, document: &[u8]) -> OmrResult<Vec<Pix>>;
}

/// Page source for raster formats: PNG, JPEG, PNM and multi-page TIFF.
///
/// PDF uploads fail with [`OmrError::Conversion`]; plug in a renderer
/// through [`PageSource`] to accept them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDocumentSource;

impl PageSource for ImageDocumentSource {
    fn pages(&self, document: &[u8]) -> OmrResult<Vec<Pix>> {
        Ok(bubblemark_io::read_document(document)?)
    }
}

/// Document to normalized page images
#[derive(Clone)]
pub struct Rasterizer {
    source: Arc<dyn PageSource>,
    options: RasterOptions,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Rasterizer {
    pub fn new(source: Arc<dyn PageSource>, options: RasterOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Decode and normalize every page of `document`.
    ///
    /// # Errors
    ///
    /// [`OmrError::Conversion`] if the document cannot be decoded or has no
    /// pages.
    pub fn rasterize(&self, document: &[u8]) -> OmrResult<Vec<Pix>> {
        if document.is_empty() {
            return Err(OmrError::Conversion("empty document".to_string()));
        }
        let pages = self.source.pages(document)?;
        if pages.is_empty() {
            return Err(OmrError::Conversion("document has no pages".to_string()));
        }
        pages
            .iter()
            .enumerate()
            .map(|(i, page)| self.normalize(i, page))
            .collect()
    }

    fn normalize(&self, index: usize, page: &Pix) -> OmrResult<Pix> {
        let gray = convert_to_gray(page).map_err(|e| OmrError::Conversion(e.to_string()))?;
        let dpi = page.xres();
        if dpi <= 0 {
            tracing::debug!(page = index, "page resolution unknown, keeping native size");
            return Ok(gray);
        }
        if (dpi as f64) < self.options.min_dpi {
            tracing::warn!(
                page = index,
                dpi,
                min_dpi = self.options.min_dpi,
                "low resolution page, detection may degrade"
            );
        }
        let factor = (self.options.target_dpi / dpi as f64) as f32;
        if (factor - 1.0).abs() < 1e-3 {
            return Ok(gray);
        }
        tracing::debug!(page = index, dpi, factor, "rescaling page");
        scale(&gray, factor, factor, ScaleMethod::Linear)
            .map_err(|e| OmrError::Conversion(e.to_string()))
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(Arc::new(ImageDocumentSource), RasterOptions::default())
    }
}
