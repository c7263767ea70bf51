//! Progress reporting service
//!
//! The orchestrator emits every observable outcome as a [`BatchEvent`]. A
//! [`ProgressReporter`] decides where those events go: nowhere, the log, or
//! a channel read by the host.

use crate::types::{BatchProgress, ModelProgress, ProcessedResult};
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted during a batch
///
/// Zero or more `Progress` and `ModelProgress` events are followed by exactly
/// one `Completed` event. Nothing is emitted after `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// One image finished successfully
    Progress(BatchProgress),
    /// Tick relayed verbatim from an external segmentation backend
    ModelProgress(ModelProgress),
    /// Terminal event with every successful result, in input order
    Completed { results: Vec<ProcessedResult> },
}

impl BatchEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Trait for receiving batch events
pub trait ProgressReporter: Send + Sync {
    /// Receive one event
    fn report_event(&self, event: BatchEvent);

    /// Report a per-image failure for diagnostics
    ///
    /// Failures are not part of the event stream; the image is simply absent
    /// from the results.
    fn report_error(&self, label: &str, error: &str) {
        let _ = (label, error);
    }
}

/// No-op progress reporter that discards all events
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_event(&self, _event: BatchEvent) {
        // Intentionally empty - discards events
    }
}

/// Console progress reporter that logs events
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to log model progress ticks and result details
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_event(&self, event: BatchEvent) {
        match event {
            BatchEvent::Progress(progress) => {
                log::info!(
                    "[{}/{}] {}",
                    progress.processed_count,
                    progress.total_count,
                    progress.current_image_label
                );
            },
            BatchEvent::ModelProgress(tick) => {
                if self.verbose {
                    log::info!("📥 {}: {}/{}", tick.stage_key, tick.current, tick.total);
                }
            },
            BatchEvent::Completed { results } => {
                let total_bytes: usize = results.iter().map(|r| r.byte_size).sum();
                log::info!(
                    "✅ Batch completed: {} images, {} bytes",
                    results.len(),
                    total_bytes
                );
                if self.verbose {
                    for result in &results {
                        log::info!(
                            "  • {} ({}x{}, {} bytes)",
                            result.filename,
                            result.width,
                            result.height,
                            result.byte_size
                        );
                    }
                }
            },
        }
    }

    fn report_error(&self, label: &str, error: &str) {
        log::error!("❌ Skipped {}: {}", label, error);
    }
}

/// Reporter forwarding events into an unbounded channel
///
/// Send errors are ignored: a dropped receiver means the caller discarded
/// the batch output.
pub struct ChannelProgressReporter {
    sender: UnboundedSender<BatchEvent>,
}

impl ChannelProgressReporter {
    #[must_use]
    pub fn new(sender: UnboundedSender<BatchEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn report_event(&self, event: BatchEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event receiver dropped, discarding batch event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn progress(count: usize) -> BatchEvent {
        BatchEvent::Progress(BatchProgress {
            processed_count: count,
            total_count: 3,
            current_image_label: format!("img{count}.png"),
        })
    }

    #[test]
    fn test_is_terminal() {
        assert!(!progress(1).is_terminal());
        assert!(BatchEvent::Completed { results: vec![] }.is_terminal());
    }

    #[tokio::test]
    async fn test_channel_reporter_forwards_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ChannelProgressReporter::new(tx);
        reporter.report_event(progress(1));
        reporter.report_event(progress(2));
        reporter.report_event(BatchEvent::Completed { results: vec![] });
        drop(reporter);

        assert_eq!(rx.recv().await, Some(progress(1)));
        assert_eq!(rx.recv().await, Some(progress(2)));
        assert!(rx.recv().await.unwrap().is_terminal());
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_channel_reporter_ignores_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let reporter = ChannelProgressReporter::new(tx);
        reporter.report_event(progress(1));
    }

    #[test]
    fn test_console_and_noop_reporters() {
        let console = ConsoleProgressReporter::new(true);
        console.report_event(progress(1));
        console.report_event(BatchEvent::ModelProgress(ModelProgress {
            stage_key: "model".to_string(),
            current: 1,
            total: 2,
        }));
        console.report_event(BatchEvent::Completed { results: vec![] });
        console.report_error("broken.png", "decode failed");

        NoOpProgressReporter.report_event(progress(2));
        NoOpProgressReporter.report_error("broken.png", "decode failed");
    }
}
