#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # IMG.LY Batch Reframing Library
//!
//! Batch image reframing: every image of a batch is fitted onto a canvas of
//! a fixed size, optionally cut out from its background, optionally given
//! rounded corners, encoded and named from a filename template.
//!
//! ## Features
//!
//! - **Fit Policies**: `contain` (letterbox), `cover` and `crop` (fill and trim)
//! - **Background Removal**: pluggable external segmentation backend, with a
//!   built-in border flood fill when none is configured
//! - **Rounded Corners**: anti-alias free corner masking
//! - **Output Formats**: JPEG, PNG and WebP with quality control
//! - **Filename Templates**: `{name}`, `{index}`, `{width}`, `{height}`,
//!   `{ratio}`, `{preset}`, `{ext}` and `{timestamp}` placeholders with
//!   sanitization and collision handling
//! - **Event Stream**: per-image progress, relayed model progress and a single
//!   terminal event carrying every result
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgly_reframe::{process_batch, BatchItem, FitPolicy, OutputFormat, TransformOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = TransformOptions::builder()
//!     .target_size(1080, 1080)
//!     .fit(FitPolicy::Cover)
//!     .output_format(OutputFormat::WebP)
//!     .corner_radius(48)
//!     .filename_template("{name}_{width}x{height}")
//!     .build()?;
//!
//! let items = vec![BatchItem::new("photo.jpg", std::fs::read("photo.jpg")?)];
//! let output = process_batch(items, &options).await?;
//! for result in output.results() {
//!     std::fs::write(&result.filename, &result.encoded_bytes)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing a running batch
//!
//! ```rust,no_run
//! use imgly_reframe::{BatchEvent, BatchProcessor, BatchRequest, TransformOptions};
//!
//! # async fn example(request: BatchRequest) -> anyhow::Result<()> {
//! let mut handle = BatchProcessor::spawn(request, None);
//! while let Some(event) = handle.next_event().await {
//!     match event {
//!         BatchEvent::Progress(p) => println!("{}/{}", p.processed_count, p.total_count),
//!         BatchEvent::ModelProgress(_) => {},
//!         BatchEvent::Completed { results } => println!("{} results", results.len()),
//!     }
//! }
//! let summary = handle.join().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and tracing setup
//! - `tracing-json`: JSON structured log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! imgly-reframe = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod corners;
pub mod error;
pub mod geometry;
pub mod naming;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use std::sync::Arc;

// Public API exports
pub use config::{
    FitPolicy, OutputFormat, Preset, TransformOptions, TransformOptionsBuilder, PRESETS,
};
pub use error::{ReframeError, Result};
pub use geometry::{Placement, Rect};
pub use naming::{FilenameRegistry, FilenameTemplate, NamingContext};
pub use processor::{
    BatchHandle, BatchOutput, BatchProcessor, BatchRequest, BatchState, BatchSummary, FailedImage,
};
pub use segmentation::{
    BackgroundSegmenter, FloodFillSegmenter, ModelProgressCallback, SegmentationBackend,
};
pub use services::{
    BatchEvent, ChannelProgressReporter, ConsoleProgressReporter, ImageIOService,
    NoOpProgressReporter, OutputFormatHandler, ProgressReporter,
};
pub use types::{AlphaMask, BatchItem, BatchProgress, ModelProgress, ProcessedResult};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat};

/// Process a batch with the built-in flood-fill segmenter
///
/// Runs the batch to completion and returns every emitted event together
/// with the batch diagnostics.
///
/// # Errors
///
/// Fails only for batch-level problems (invalid options or target
/// dimensions). Images that cannot be processed are skipped and listed in
/// [`BatchSummary::failures`].
pub async fn process_batch(items: Vec<BatchItem>, options: &TransformOptions) -> Result<BatchOutput> {
    process_batch_with_backend(items, options, None).await
}

/// Process a batch, segmenting with `backend` when background removal is on
///
/// With `backend` set, a failing backend skips the affected images; there is
/// no fallback to the flood fill.
pub async fn process_batch_with_backend(
    items: Vec<BatchItem>,
    options: &TransformOptions,
    backend: Option<Arc<dyn SegmentationBackend>>,
) -> Result<BatchOutput> {
    BatchProcessor::spawn(BatchRequest::new(items, options.clone()), backend)
        .collect()
        .await
}
