//! Batch orchestrator
//!
//! This module provides the `BatchProcessor` that sequences the per-image
//! pipeline (decode, fit, composite, segment, round corners, encode, name)
//! and turns its outcome into a stream of [`BatchEvent`]s.
//!
//! Images are processed strictly one at a time, in input order. A failing
//! image is logged and left out of the results; it never aborts the batch.

use crate::{
    compositor::{self, CanvasFill, OPAQUE_FILL},
    config::TransformOptions,
    corners::corner_mask,
    error::{ReframeError, Result},
    geometry,
    naming::{FilenameRegistry, FilenameTemplate, NamingContext, TIMESTAMP_FORMAT},
    segmentation::{BackgroundSegmenter, SegmentationBackend},
    services::{
        BatchEvent, ChannelProgressReporter, ImageIOService, NoOpProgressReporter,
        OutputFormatHandler, ProgressReporter,
    },
    types::{BatchItem, BatchProgress, ModelProgress, ProcessedResult},
};
use image::imageops;
use instant::Instant;
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, span, warn, Instrument, Level};

/// Lifecycle of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    /// The batch could not start (invalid options or dimensions)
    Aborted,
}

/// A batch submission: ordered inputs plus the options shared by all of them
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    pub options: TransformOptions,
}

impl BatchRequest {
    #[must_use]
    pub fn new(items: Vec<BatchItem>, options: TransformOptions) -> Self {
        Self { items, options }
    }
}

/// Diagnostic record of an image left out of the results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedImage {
    pub source_id: String,
    /// 1-based position in the batch
    pub index: usize,
    pub error: String,
}

/// Diagnostics for a finished batch
///
/// The results themselves travel only in the terminal `Completed` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<FailedImage>,
    pub elapsed_ms: u64,
}

/// Sequential batch pipeline
pub struct BatchProcessor {
    options: TransformOptions,
    template: FilenameTemplate,
    segmenter: BackgroundSegmenter,
    reporter: Arc<dyn ProgressReporter>,
    timestamp: Option<String>,
    state: BatchState,
}

impl BatchProcessor {
    /// Create a processor for one batch
    ///
    /// Options are normalized here, once: zero dimensions get the default,
    /// JPEG is coerced to PNG when removing backgrounds and the corner radius
    /// is clamped.
    #[must_use]
    pub fn new(
        options: &TransformOptions,
        segmenter: BackgroundSegmenter,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let resolved = options.resolved();
        if resolved.output_format != options.output_format {
            info!(
                requested = %options.output_format,
                effective = %resolved.output_format,
                "Output format coerced: background removal needs transparency"
            );
        }

        Self {
            template: FilenameTemplate::new(resolved.filename_template.clone()),
            options: resolved,
            segmenter,
            reporter,
            timestamp: None,
            state: BatchState::Idle,
        }
    }

    /// Processor with the flood-fill segmenter and no event output
    #[must_use]
    pub fn with_defaults(options: &TransformOptions) -> Self {
        Self::new(
            options,
            BackgroundSegmenter::default(),
            Arc::new(NoOpProgressReporter),
        )
    }

    /// Use a fixed `{timestamp}` value instead of the batch start time
    #[must_use]
    pub fn with_timestamp<S: Into<String>>(mut self, timestamp: S) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Normalized options used for every image
    #[must_use]
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Spawn a batch on the tokio runtime
    ///
    /// The batch runs in its own task and communicates only through the
    /// returned handle's event channel. Must be called from within a runtime.
    #[must_use]
    pub fn spawn(
        request: BatchRequest,
        backend: Option<Arc<dyn SegmentationBackend>>,
    ) -> BatchHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let reporter: Arc<dyn ProgressReporter> = Arc::new(ChannelProgressReporter::new(sender));
        let segmenter = BackgroundSegmenter::select(backend);

        let task = tokio::spawn(async move {
            let mut processor = BatchProcessor::new(&request.options, segmenter, reporter);
            processor.run(request.items).await
        });

        BatchHandle {
            events: receiver,
            task,
        }
    }

    /// Process every item in order and emit the terminal event
    ///
    /// # Errors
    ///
    /// Returns `ReframeError` for batch-level problems only, before any image
    /// is touched:
    /// - `InvalidConfig` for out-of-range options
    /// - `InvalidDimensions` for a zero-sized canvas
    /// - `Internal` when the processor already ran
    ///
    /// Per-image failures never surface here; they are recorded in the
    /// returned summary.
    pub async fn run(&mut self, items: Vec<BatchItem>) -> Result<BatchSummary> {
        if self.state != BatchState::Idle {
            return Err(ReframeError::internal(format!(
                "Batch processor cannot run from state {:?}",
                self.state
            )));
        }

        let (canvas_width, canvas_height) = self.options.canvas_size();
        let validation = self.options.validate().and_then(|()| {
            geometry::validate_dimensions(canvas_width, canvas_height, "target canvas")
        });
        if let Err(e) = validation {
            self.state = BatchState::Aborted;
            warn!(error = %e, "Batch rejected before processing");
            return Err(e);
        }

        self.state = BatchState::Running;
        let started = Instant::now();
        let total = items.len();
        let timestamp = self
            .timestamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string());

        let batch_span = span!(
            Level::INFO,
            "batch_processing",
            file_count = %total,
            canvas = %format!("{canvas_width}x{canvas_height}"),
            fit = %self.options.fit,
            format = %self.options.output_format,
            segmenter = %self.segmenter.name()
        );

        let (results, failures) = self
            .process_items(items, &timestamp)
            .instrument(batch_span)
            .await;

        let summary = BatchSummary {
            total,
            succeeded: results.len(),
            failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            succeeded = summary.succeeded,
            failed = summary.failures.len(),
            elapsed_ms = summary.elapsed_ms,
            "Batch completed"
        );

        self.state = BatchState::Completed;
        self.reporter.report_event(BatchEvent::Completed { results });
        Ok(summary)
    }

    async fn process_items(
        &self,
        items: Vec<BatchItem>,
        timestamp: &str,
    ) -> (Vec<ProcessedResult>, Vec<FailedImage>) {
        let total = items.len();
        let mut registry = FilenameRegistry::new();
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (position, item) in items.into_iter().enumerate() {
            let index = position + 1;
            let label = item.id.clone();

            match self.process_item(index, item, timestamp, &mut registry).await {
                Ok(result) => {
                    debug!(
                        source = %label,
                        filename = %result.filename,
                        bytes = result.byte_size,
                        "Image processed"
                    );
                    results.push(result);
                    self.reporter
                        .report_event(BatchEvent::Progress(BatchProgress {
                            processed_count: results.len(),
                            total_count: total,
                            current_image_label: label,
                        }));
                },
                Err(e) => {
                    if e.is_per_image() {
                        warn!(source = %label, index, error = %e, "Skipping image");
                    } else {
                        error!(
                            source = %label,
                            index,
                            error = %e,
                            "Unexpected failure, skipping image"
                        );
                    }
                    self.reporter.report_error(&label, &e.to_string());
                    failures.push(FailedImage {
                        source_id: label,
                        index,
                        error: e.to_string(),
                    });
                },
            }
        }

        (results, failures)
    }

    /// Run the full pipeline for one image
    ///
    /// CPU-bound steps run on the blocking thread pool. Background removal
    /// only looks at the content box, so letterbox margins never take part in
    /// segmentation. The item and every
    /// intermediate buffer are dropped when this returns.
    #[instrument(skip_all, fields(source = %item.id, index = index))]
    async fn process_item(
        &self,
        index: usize,
        item: BatchItem,
        timestamp: &str,
        registry: &mut FilenameRegistry,
    ) -> Result<ProcessedResult> {
        let format = self.options.output_format;
        let canvas_size = self.options.canvas_size();
        let fit = self.options.fit;
        let remove_background = self.options.remove_background;
        let transparent = OutputFormatHandler::supports_transparency(format);
        let stem = item.stem().to_string();
        let source_image_id = item.id.clone();

        let (canvas, placement, content) = run_blocking(move || {
            let source = ImageIOService::decode(&item)?;
            let placement = geometry::resolve(source.dimensions(), canvas_size, fit)?;
            let fill = if transparent {
                CanvasFill::Transparent
            } else {
                CanvasFill::Opaque(OPAQUE_FILL)
            };
            let canvas = compositor::composite(&source.pixels, &placement, canvas_size, fill);
            let dst = placement.dst;
            let content = remove_background.then(|| {
                imageops::crop_imm(&canvas, dst.x, dst.y, dst.width, dst.height).to_image()
            });
            Ok((canvas, placement, content))
        })
        .await?;
        debug!(src = ?placement.src, dst = ?placement.dst, "Resolved placement");

        let cutout = match content {
            Some(content) => {
                let reporter = Arc::clone(&self.reporter);
                let relay = move |stage: &str, current: u64, total: u64| {
                    reporter.report_event(BatchEvent::ModelProgress(ModelProgress {
                        stage_key: stage.to_string(),
                        current,
                        total,
                    }));
                };
                let mask = self
                    .segmenter
                    .segment(content, &relay)
                    .instrument(span!(Level::DEBUG, "segmentation", strategy = %self.segmenter.name()))
                    .await?;
                Some(mask)
            },
            None => None,
        };

        let (width, height) = canvas_size;
        let radius = self.options.corner_radius;
        let quality = self.options.quality;
        let dst = placement.dst;
        let encoded_bytes = run_blocking(move || {
            let mut canvas = canvas;
            if let Some(mask) = cutout {
                mask.apply_to_region(&mut canvas, dst.x, dst.y);
            }
            if radius > 0 {
                corner_mask(width, height, radius).apply_to(&mut canvas);
            }
            if !transparent {
                compositor::flatten(&mut canvas, OPAQUE_FILL);
            }
            OutputFormatHandler::encode(&canvas, format, quality)
        })
        .await?;

        let candidate = self.template.expand(&NamingContext {
            name: &stem,
            index,
            width,
            height,
            format,
            preset: self.options.preset_label.as_deref(),
            timestamp,
        });
        let filename = registry.make_unique(&candidate);

        Ok(ProcessedResult {
            byte_size: encoded_bytes.len(),
            encoded_bytes,
            filename,
            width,
            height,
            source_image_id,
        })
    }
}

/// Run CPU-bound work on the blocking pool so the runtime stays responsive
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ReframeError::internal(format!("Blocking task failed: {e}")))?
}

/// Everything a spawned batch produced
#[derive(Debug)]
pub struct BatchOutput {
    /// Events in emission order, ending with `Completed`
    pub events: Vec<BatchEvent>,
    pub summary: BatchSummary,
}

impl BatchOutput {
    /// Results carried by the terminal event
    #[must_use]
    pub fn results(&self) -> &[ProcessedResult] {
        self.events
            .iter()
            .find_map(|event| match event {
                BatchEvent::Completed { results } => Some(results.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Per-image progress events
    pub fn progress(&self) -> impl Iterator<Item = &BatchProgress> {
        self.events.iter().filter_map(|event| match event {
            BatchEvent::Progress(progress) => Some(progress),
            _ => None,
        })
    }

    /// Consume the output, keeping only the results
    #[must_use]
    pub fn into_results(self) -> Vec<ProcessedResult> {
        self.events
            .into_iter()
            .find_map(|event| match event {
                BatchEvent::Completed { results } => Some(results),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Handle to a spawned batch
pub struct BatchHandle {
    events: UnboundedReceiver<BatchEvent>,
    task: JoinHandle<Result<BatchSummary>>,
}

impl BatchHandle {
    /// Next event, `None` once the batch task has finished
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Wait for the batch to finish, discarding pending events
    pub async fn join(self) -> Result<BatchSummary> {
        drop(self.events);
        self.task
            .await
            .map_err(|e| ReframeError::internal(format!("Batch task failed: {e}")))?
    }

    /// Drain every event and wait for the batch to finish
    pub async fn collect(mut self) -> Result<BatchOutput> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let summary = self
            .task
            .await
            .map_err(|e| ReframeError::internal(format!("Batch task failed: {e}")))??;
        Ok(BatchOutput { events, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{FitPolicy, OutputFormat},
        segmentation::test_utils::MockSegmentationBackend,
    };
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_item(id: &str, width: u32, height: u32) -> BatchItem {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        BatchItem::new(id, cursor.into_inner())
    }

    fn options(template: &str) -> TransformOptions {
        TransformOptions::builder()
            .target_size(64, 32)
            .fit(FitPolicy::Cover)
            .filename_template(template)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let mut processor = BatchProcessor::with_defaults(&options("{name}"));
        assert_eq!(processor.state(), BatchState::Idle);

        let summary = processor.run(vec![png_item("a.png", 10, 10)]).await.unwrap();
        assert_eq!(processor.state(), BatchState::Completed);
        assert_eq!(summary.succeeded, 1);

        let again = processor.run(vec![]).await;
        assert!(matches!(again, Err(ReframeError::Internal(_))));
    }

    #[tokio::test]
    async fn test_invalid_options_abort_before_processing() {
        let bad = TransformOptions {
            quality: 150,
            ..TransformOptions::default()
        };
        let mut processor = BatchProcessor::with_defaults(&bad);
        let result = processor.run(vec![png_item("a.png", 4, 4)]).await;
        assert!(matches!(result, Err(ReframeError::InvalidConfig(_))));
        assert_eq!(processor.state(), BatchState::Aborted);
    }

    #[tokio::test]
    async fn test_shared_timestamp_and_collisions() {
        let request = BatchRequest::new(
            vec![png_item("same.png", 8, 8), png_item("same.png", 9, 9)],
            options("{name}_{timestamp}.{ext}"),
        );
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut processor = BatchProcessor::new(
            &request.options,
            BackgroundSegmenter::default(),
            Arc::new(ChannelProgressReporter::new(sender)),
        )
        .with_timestamp("20240102-030405");

        processor.run(request.items).await.unwrap();
        drop(processor);

        let mut results = Vec::new();
        while let Some(event) = receiver.recv().await {
            if let BatchEvent::Completed { results: r } = event {
                results = r;
            }
        }
        let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["same_20240102-030405.png", "same_20240102-030405(1).png"]
        );
    }

    #[tokio::test]
    async fn test_external_segmenter_progress_is_relayed() {
        let backend = Arc::new(
            MockSegmentationBackend::new()
                .with_coverage(0.5)
                .with_progress_steps(2),
        );
        let opts = TransformOptions::builder()
            .target_size(16, 16)
            .remove_background(true)
            .build()
            .unwrap();

        let output = BatchProcessor::spawn(
            BatchRequest::new(vec![png_item("a.png", 16, 16)], opts),
            Some(backend.clone() as Arc<dyn SegmentationBackend>),
        )
        .collect()
        .await
        .unwrap();

        let ticks: Vec<_> = output
            .events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ModelProgress(tick) => Some(tick.current),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(backend.get_call_history().len(), 1);

        let result = &output.results()[0];
        let decoded = image::load_from_memory(&result.encoded_bytes).unwrap().to_rgba8();
        assert!(decoded.pixels().all(|p| p[3] == 128));
    }

    #[tokio::test]
    async fn test_segmentation_sees_only_the_content_box() {
        let backend = Arc::new(MockSegmentationBackend::new().with_coverage(0.5));
        let opts = TransformOptions::builder()
            .target_size(16, 16)
            .fit(FitPolicy::Contain)
            .remove_background(true)
            .build()
            .unwrap();

        let output = BatchProcessor::spawn(
            BatchRequest::new(vec![png_item("wide.png", 32, 16)], opts),
            Some(backend.clone() as Arc<dyn SegmentationBackend>),
        )
        .collect()
        .await
        .unwrap();

        assert_eq!(backend.get_call_history(), vec!["segment 16x8".to_string()]);

        let decoded = image::load_from_memory(&output.results()[0].encoded_bytes)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 16));
        // Letterbox bars stay transparent, the content box gets the mask
        assert_eq!(decoded.get_pixel(8, 0)[3], 0);
        assert_eq!(decoded.get_pixel(8, 15)[3], 0);
        assert_eq!(decoded.get_pixel(0, 4)[3], 128);
        assert_eq!(decoded.get_pixel(15, 11)[3], 128);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_pipeline_on_current_thread_runtime() {
        let opts = TransformOptions::builder()
            .target_size(48, 32)
            .fit(FitPolicy::Contain)
            .remove_background(true)
            .corner_radius(6)
            .output_format(OutputFormat::WebP)
            .build()
            .unwrap();
        let mut processor = BatchProcessor::with_defaults(&opts);

        let summary = processor
            .run(vec![png_item("a.png", 40, 40), png_item("b.png", 64, 20)])
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert!(summary.failures.is_empty());
        assert_eq!(processor.state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn test_external_segmenter_failure_skips_image() {
        let backend = Arc::new(MockSegmentationBackend::new_failing());
        let opts = TransformOptions::builder()
            .remove_background(true)
            .target_size(8, 8)
            .build()
            .unwrap();

        let output = BatchProcessor::spawn(
            BatchRequest::new(
                vec![png_item("a.png", 8, 8), png_item("b.png", 8, 8)],
                opts,
            ),
            Some(backend.clone() as Arc<dyn SegmentationBackend>),
        )
        .collect()
        .await
        .unwrap();

        assert!(output.results().is_empty());
        assert_eq!(output.progress().count(), 0);
        assert_eq!(output.summary.failures.len(), 2);
        assert!(output.summary.failures[0]
            .error
            .starts_with("Segmentation unavailable"));
        assert_eq!(backend.get_call_history().len(), 2);
        assert!(output.events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_corner_radius_clears_corners() {
        let opts = TransformOptions::builder()
            .target_size(40, 40)
            .corner_radius(10)
            .build()
            .unwrap();
        let output = BatchProcessor::spawn(
            BatchRequest::new(vec![png_item("a.png", 40, 40)], opts),
            None,
        )
        .collect()
        .await
        .unwrap();

        let decoded = image::load_from_memory(&output.results()[0].encoded_bytes)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(20, 20)[3], 255);
    }

    #[tokio::test]
    async fn test_jpeg_corners_show_fill() {
        let opts = TransformOptions::builder()
            .target_size(40, 40)
            .corner_radius(20)
            .output_format(OutputFormat::Jpeg)
            .quality(100)
            .build()
            .unwrap();
        let mut item = png_item("dark.png", 40, 40);
        let dark = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let mut cursor = Cursor::new(Vec::new());
        dark.write_to(&mut cursor, ImageFormat::Png).unwrap();
        item.bytes = cursor.into_inner();

        let output = BatchProcessor::spawn(BatchRequest::new(vec![item], opts), None)
            .collect()
            .await
            .unwrap();
        let result = &output.results()[0];
        assert!(result.filename.ends_with(".jpg"));

        let decoded = image::load_from_memory(&result.encoded_bytes).unwrap().to_rgb8();
        assert!(decoded.get_pixel(0, 0)[0] > 200);
        assert!(decoded.get_pixel(20, 20)[0] < 40);
    }

    #[tokio::test]
    async fn test_join_without_reading_events() {
        let handle = BatchProcessor::spawn(
            BatchRequest::new(vec![png_item("a.png", 5, 5)], options("{name}")),
            None,
        );
        let summary = handle.join().await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
    }
}
