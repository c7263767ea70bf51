//! Image I/O operations service
//!
//! Decoding of submitted bytes plus the file helpers used by the CLI
//! frontend to build batches and write results.

use crate::{
    error::{ReframeError, Result},
    types::{BatchItem, ProcessedResult, SourceImage},
};
use std::path::{Path, PathBuf};

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Decode raw bytes into an RGBA source image
    ///
    /// The format is detected from the content, not from the identifier.
    ///
    /// # Errors
    /// Returns `ReframeError::DecodeFailure` for unrecognized or corrupt data
    /// and for images with a zero dimension.
    pub fn decode(item: &BatchItem) -> Result<SourceImage> {
        if item.bytes.is_empty() {
            return Err(ReframeError::decode(format!("'{}' is empty", item.id)));
        }

        let image = image::load_from_memory(&item.bytes)
            .map_err(|e| ReframeError::decode(format!("'{}': {e}", item.id)))?;
        let pixels = image.into_rgba8();

        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(ReframeError::decode(format!(
                "'{}' has no pixels ({width}x{height})",
                item.id
            )));
        }

        Ok(SourceImage {
            id: item.id.clone(),
            pixels,
        })
    }

    /// Read a file into a batch item identified by its file name
    pub fn read_item<P: AsRef<Path>>(path: P) -> Result<BatchItem> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ReframeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read '{}': {e}", path.display()),
            ))
        })?;
        let id = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(BatchItem::new(id, bytes))
    }

    /// Write a result into `output_dir` under its final filename
    pub fn save_result<P: AsRef<Path>>(output_dir: P, result: &ProcessedResult) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(&result.filename);
        std::fs::write(&path, &result.encoded_bytes).map_err(|e| {
            ReframeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write '{}': {e}", path.display()),
            ))
        })?;
        Ok(path)
    }

    /// Check if a file has a supported input extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp"
                )
            })
    }
}
