//! Batch reframing CLI tool
//!
//! Collects input files, runs them through one batch and writes every result
//! into the output directory under its final filename.

use super::config::CliConfigBuilder;
use crate::{
    processor::{BatchProcessor, BatchRequest},
    services::{BatchEvent, ImageIOService},
    tracing_config::{init_cli_tracing, spans},
    types::ProcessedResult,
    PRESETS,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, Instrument};

/// Batch image reframing CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-reframe")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required_unless_present = "list_presets")]
    pub input: Vec<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "reframed")]
    pub output: PathBuf,

    /// Target canvas width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Target canvas height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// How the source is fitted onto the canvas
    #[arg(long, value_enum)]
    pub fit: Option<CliFitPolicy>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Encoder quality (0-100, ignored for PNG)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Corner radius in pixels
    #[arg(long)]
    pub corner_radius: Option<u32>,

    /// Remove the background before encoding
    #[arg(long)]
    pub remove_background: bool,

    /// Output filename template, e.g. "{name}_{width}x{height}"
    #[arg(short, long)]
    pub template: Option<String>,

    /// Named canvas preset (see --list-presets)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// JSON options file; individual flags take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit JSON logs (requires the tracing-json feature)
    #[arg(long)]
    pub json_logs: bool,

    /// List built-in presets and exit
    #[arg(long)]
    pub list_presets: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliFitPolicy {
    Contain,
    Cover,
    Crop,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_presets {
        list_presets();
        return Ok(());
    }

    let session_id =
        init_cli_tracing(cli.verbose, cli.json_logs).context("Failed to initialize tracing")?;

    let options = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let files = collect_inputs(&cli)?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }

    let session_span = spans::session(&session_id, files.len());
    async move {
        info!("Found {} image file(s) to process", files.len());
        let start_time = Instant::now();

        let items = read_items(&files);
        let written = run_batch(&cli, BatchRequest::new(items, options)).await?;

        info!(
            "Wrote {} image(s) to {} in {:.2}s",
            written,
            cli.output.display(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }
    .instrument(session_span)
    .await
}

fn list_presets() {
    println!("📐 Built-in presets:");
    for preset in PRESETS {
        println!(
            "  • {:<20} {}x{} ({{preset}} = {})",
            preset.key, preset.width, preset.height, preset.label
        );
    }
}

/// Read every file into a batch item, skipping unreadable files
fn read_items(files: &[PathBuf]) -> Vec<crate::types::BatchItem> {
    files
        .iter()
        .filter_map(|path| match ImageIOService::read_item(path) {
            Ok(item) => Some(item),
            Err(e) => {
                error!("❌ Failed to read {}: {}", path.display(), e);
                None
            },
        })
        .collect()
}

/// Run one batch, drive the progress bar from its events and save the results
async fn run_batch(cli: &Cli, request: BatchRequest) -> Result<usize> {
    let total = request.items.len();
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut handle = BatchProcessor::spawn(request, None);
    let mut results = Vec::new();

    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Progress(progress) => {
                progress_bar.set_position(progress.processed_count as u64);
                progress_bar.set_message(progress.current_image_label);
            },
            BatchEvent::ModelProgress(tick) => {
                progress_bar.set_message(format!("{} {}/{}", tick.stage_key, tick.current, tick.total));
            },
            BatchEvent::Completed { results: finished } => {
                results = finished;
            },
        }
    }

    let summary = handle.join().await.context("Batch failed")?;
    progress_bar.finish_with_message(format!(
        "Completed! Processed: {}, Failed: {}",
        summary.succeeded,
        summary.failures.len()
    ));

    for failure in &summary.failures {
        warn!("Skipped #{} {}: {}", failure.index, failure.source_id, failure.error);
    }

    let written = save_results(&cli.output, &results)?;
    debug!(elapsed_ms = summary.elapsed_ms, "Batch timing");
    Ok(written)
}

fn save_results(output_dir: &Path, results: &[ProcessedResult]) -> Result<usize> {
    let _span = spans::output_writing(output_dir, results.len()).entered();

    if output_dir.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_dir.display()
        );
    }

    for result in results {
        let path = ImageIOService::save_result(output_dir, result)
            .with_context(|| format!("Failed to save {}", result.filename))?;
        debug!(path = %path.display(), bytes = result.byte_size, "Saved result");
    }
    Ok(results.len())
}

/// Expand CLI inputs into a sorted list of image files
fn collect_inputs(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let _span = spans::input_discovery(cli.pattern.as_deref().unwrap_or("*")).entered();
            files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    // Alphanumeric order decides {index}
    files.sort();
    Ok(files)
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let walker = walkdir::WalkDir::new(dir).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && ImageIOService::is_supported_format(path)
            && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(path: &Path) {
        RgbaImage::from_pixel(12, 8, Rgba([200, 10, 10, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn cli_for(args: &[&str]) -> Cli {
        let mut argv = vec!["imgly-reframe"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern(Path::new("any_file.jpg"), None));
        assert!(matches_pattern(Path::new("test.jpg"), Some("*.jpg")));
        assert!(matches_pattern(Path::new("img_001.jpg"), Some("img_*.jpg")));
        assert!(matches_pattern(Path::new("image001.jpg"), Some("image???.jpg")));
        assert!(!matches_pattern(Path::new("test.png"), Some("*.jpg")));
        assert!(!matches_pattern(Path::new(""), Some("*.jpg")));
    }

    #[test]
    fn test_find_image_files_recursive_and_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write_png(&dir.path().join("a.png"));
        write_png(&dir.path().join("b.png"));
        write_png(&nested.join("c.png"));
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let flat = find_image_files(dir.path(), false, None).unwrap();
        assert_eq!(flat.len(), 2);

        let deep = find_image_files(dir.path(), true, None).unwrap();
        assert_eq!(deep.len(), 3);

        let only_b = find_image_files(dir.path(), true, Some("b.*")).unwrap();
        assert_eq!(only_b, vec![dir.path().join("b.png")]);
    }

    #[test]
    fn test_collect_inputs_sorted_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("z.png"));
        write_png(&dir.path().join("a.png"));

        let cli = cli_for(&[dir.path().to_str().unwrap()]);
        let files = collect_inputs(&cli).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "z.png"]);

        let missing = cli_for(&["/definitely/not/here.png"]);
        assert!(collect_inputs(&missing).is_err());
    }

    #[tokio::test]
    async fn test_run_batch_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        write_png(&input);
        let out = dir.path().join("out");

        let cli = cli_for(&[
            "-o",
            out.to_str().unwrap(),
            "--width",
            "20",
            "--height",
            "20",
            "--template",
            "{name}_{index}",
            input.to_str().unwrap(),
        ]);
        let options = CliConfigBuilder::from_cli(&cli).unwrap();
        let items = read_items(&collect_inputs(&cli).unwrap());

        let written = run_batch(&cli, BatchRequest::new(items, options)).await.unwrap();
        assert_eq!(written, 1);

        let saved = image::open(out.join("photo_1.png")).unwrap();
        assert_eq!((saved.width(), saved.height()), (20, 20));
    }
}
