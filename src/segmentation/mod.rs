//! Background segmentation strategies
//!
//! Two interchangeable strategies produce an [`AlphaMask`] for a canvas:
//! - an external backend (e.g. an ML model) injected by the caller
//! - the built-in [`FloodFillSegmenter`], always available
//!
//! The orchestrator only sees [`BackgroundSegmenter`] and does not care which
//! variant is active.

pub mod flood_fill;

#[cfg(test)]
pub mod test_utils;

pub use flood_fill::{estimate_background, FloodFillSegmenter};

use crate::{
    error::{ReframeError, Result},
    processor::run_blocking,
    types::AlphaMask,
};
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;

/// Progress callback handed to external backends: `(stage_key, current, total)`
pub type ModelProgressCallback<'a> = &'a (dyn Fn(&str, u64, u64) + Send + Sync);

/// External segmentation capability
///
/// Implementations may download or load a model on first use and report that
/// through the progress callback. Within one call, `current` should never
/// decrease for a given stage.
#[async_trait]
pub trait SegmentationBackend: Send + Sync {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Produce a coverage mask with the same dimensions as `image`
    ///
    /// # Errors
    /// - Model unavailable or failed to load
    /// - Inference failures
    async fn segment(
        &self,
        image: &RgbaImage,
        progress: ModelProgressCallback<'_>,
    ) -> Result<AlphaMask>;
}

/// Segmentation strategy used by a batch
#[derive(Clone)]
pub enum BackgroundSegmenter {
    /// Delegate to an injected backend; failures skip the image
    External(Arc<dyn SegmentationBackend>),
    /// Built-in border-sampling flood fill
    FloodFill(FloodFillSegmenter),
}

impl std::fmt::Debug for BackgroundSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External(backend) => f.debug_tuple("External").field(&backend.name()).finish(),
            Self::FloodFill(segmenter) => f.debug_tuple("FloodFill").field(segmenter).finish(),
        }
    }
}

impl Default for BackgroundSegmenter {
    fn default() -> Self {
        Self::FloodFill(FloodFillSegmenter::default())
    }
}

impl BackgroundSegmenter {
    /// Pick the external backend when one is available, the flood fill otherwise
    #[must_use]
    pub fn select(backend: Option<Arc<dyn SegmentationBackend>>) -> Self {
        match backend {
            Some(backend) => Self::External(backend),
            None => Self::default(),
        }
    }

    /// Strategy name for logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::External(backend) => backend.name(),
            Self::FloodFill(_) => "flood-fill",
        }
    }

    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// Segment an image with the active strategy
    ///
    /// The flood fill runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `ReframeError::SegmentationUnavailable` when the external
    /// backend fails or returns a mask of the wrong size. There is no
    /// fallback to the flood fill.
    pub async fn segment(
        &self,
        image: RgbaImage,
        progress: ModelProgressCallback<'_>,
    ) -> Result<AlphaMask> {
        match self {
            Self::FloodFill(segmenter) => {
                let segmenter = *segmenter;
                run_blocking(move || Ok(segmenter.segment(&image))).await
            },
            Self::External(backend) => {
                let mask = backend.segment(&image, progress).await.map_err(|e| match e {
                    ReframeError::SegmentationUnavailable(_) => e,
                    other => ReframeError::segmentation(format!("{}: {other}", backend.name())),
                })?;

                if mask.dimensions() != image.dimensions() {
                    let (mw, mh) = mask.dimensions();
                    let (iw, ih) = image.dimensions();
                    return Err(ReframeError::segmentation(format!(
                        "{} returned a {mw}x{mh} mask for a {iw}x{ih} image",
                        backend.name()
                    )));
                }
                Ok(mask)
            },
        }
    }
}
