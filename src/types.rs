//! Core data types shared across the pipeline

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// One input of a batch: a source identifier plus its undecoded bytes
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Source identifier, usually the original file name
    pub id: String,
    /// Raw encoded image data
    pub bytes: Vec<u8>,
}

impl BatchItem {
    #[must_use]
    pub fn new<S: Into<String>>(id: S, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            bytes,
        }
    }

    /// Source file name without directories or extension
    #[must_use]
    pub fn stem(&self) -> &str {
        let file_name = self
            .id
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.id.as_str());
        match file_name.rfind('.') {
            Some(pos) if pos > 0 => file_name.get(..pos).unwrap_or(file_name),
            _ => file_name,
        }
    }
}

/// Decoded source pixels, immutable for the rest of the pipeline pass
#[derive(Debug)]
pub struct SourceImage {
    pub id: String,
    pub pixels: RgbaImage,
}

impl SourceImage {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Per-pixel coverage map
///
/// Values are in `0.0..=1.0`: 0 is fully background, 1 fully foreground,
/// anything in between a feathered edge.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl AlphaMask {
    /// Fully opaque mask
    #[must_use]
    pub fn opaque(width: u32, height: u32) -> Self {
        Self::filled(width, height, 1.0)
    }

    /// Mask with every pixel set to `value`
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value.clamp(0.0, 1.0); width as usize * height as usize],
        }
    }

    /// Build a mask from raw row-major coverage values
    ///
    /// Returns `None` when the data length does not match the dimensions.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        let data = data.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Coverage at a pixel, 0 outside the mask
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Row-major coverage values
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Multiply the image's alpha channel by this mask
    ///
    /// Applying two masks in sequence intersects them.
    pub fn apply_to(&self, image: &mut RgbaImage) {
        debug_assert_eq!(image.dimensions(), self.dimensions());
        for (pixel, coverage) in image.pixels_mut().zip(self.data.iter()) {
            let alpha = f32::from(pixel[3]) * coverage;
            pixel[3] = alpha.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Multiply the alpha of the region whose top-left corner is at
    /// (`left`, `top`) by this mask
    ///
    /// Pixels outside the region are untouched; mask cells falling outside
    /// the image are ignored.
    pub fn apply_to_region(&self, image: &mut RgbaImage, left: u32, top: u32) {
        for y in 0..self.height {
            for x in 0..self.width {
                let (Some(px), Some(py)) = (left.checked_add(x), top.checked_add(y)) else {
                    continue;
                };
                if let Some(pixel) = image.get_pixel_mut_checked(px, py) {
                    let alpha = f32::from(pixel[3]) * self.get(x, y);
                    pixel[3] = alpha.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

/// Output of one successfully processed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Encoded image data
    #[serde(skip)]
    pub encoded_bytes: Vec<u8>,
    /// Unique output filename within the batch
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Length of `encoded_bytes`
    pub byte_size: usize,
    /// Identifier of the source this result was produced from
    pub source_image_id: String,
}

/// Transient progress snapshot, emitted once per completed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Images completed so far
    pub processed_count: usize,
    /// Images submitted in the batch
    pub total_count: usize,
    /// Original (pre-rename) label of the image just completed
    pub current_image_label: String,
}

/// Progress tick relayed from an external segmentation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProgress {
    /// Backend-defined stage, e.g. a model file being fetched
    pub stage_key: String,
    pub current: u64,
    pub total: u64,
}
