//! Mock segmentation backend for testing the external strategy
//!
//! Lets tests exercise the external-backend path of the pipeline without a
//! real model: calls are recorded, failures can be simulated and progress
//! ticks are emitted on every call.

use super::{ModelProgressCallback, SegmentationBackend};
use crate::{
    error::{ReframeError, Result},
    types::AlphaMask,
};
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::{Arc, Mutex};

/// Mock external segmenter
#[derive(Debug, Clone)]
pub struct MockSegmentationBackend {
    /// Coverage value written to every pixel of the returned mask
    coverage: f32,
    /// Number of progress steps reported per call
    progress_steps: u64,
    /// Forced mask size, to simulate misbehaving backends
    mask_size: Option<(u32, u32)>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate a backend failure
    should_fail: bool,
}

impl MockSegmentationBackend {
    /// Create a mock that keeps every pixel
    #[must_use]
    pub fn new() -> Self {
        Self {
            coverage: 1.0,
            progress_steps: 0,
            mask_size: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Create a mock whose every call fails
    #[must_use]
    pub fn new_failing() -> Self {
        let mut backend = Self::new();
        backend.should_fail = true;
        backend
    }

    #[must_use]
    pub fn with_coverage(mut self, coverage: f32) -> Self {
        self.coverage = coverage;
        self
    }

    #[must_use]
    pub fn with_progress_steps(mut self, steps: u64) -> Self {
        self.progress_steps = steps;
        self
    }

    #[must_use]
    pub fn with_mask_size(mut self, width: u32, height: u32) -> Self {
        self.mask_size = Some((width, height));
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(call);
        }
    }
}

impl Default for MockSegmentationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentationBackend for MockSegmentationBackend {
    fn name(&self) -> &str {
        "mock-segmenter"
    }

    async fn segment(
        &self,
        image: &RgbaImage,
        progress: ModelProgressCallback<'_>,
    ) -> Result<AlphaMask> {
        let (width, height) = image.dimensions();
        self.record_call(format!("segment {width}x{height}"));

        if self.should_fail {
            return Err(ReframeError::internal("Mock backend failure"));
        }

        if self.progress_steps > 0 {
            for step in 0..=self.progress_steps {
                progress("model", step, self.progress_steps);
                tokio::task::yield_now().await;
            }
        }

        let (width, height) = self.mask_size.unwrap_or((width, height));
        Ok(AlphaMask::filled(width, height, self.coverage))
    }
}
