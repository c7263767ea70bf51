//! Output format handling service
//!
//! This module separates output encoding from the pipeline logic, making the
//! system more testable and maintainable.

use crate::{
    config::OutputFormat,
    error::{ReframeError, Result},
};
use image::{
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage,
};

/// Service for handling output format encoding
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA canvas to the given format
    ///
    /// # Arguments
    /// * `canvas` - Composited RGBA canvas
    /// * `format` - Effective output format
    /// * `quality` - Encoder quality (0-100), ignored for PNG
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Encoded image data
    /// * `Err(ReframeError::EncodeFailure)` - Encoder rejected the image
    ///
    /// # Examples
    /// ```rust
    /// use imgly_reframe::{services::OutputFormatHandler, OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let canvas = RgbaImage::new(8, 8);
    /// let png = OutputFormatHandler::encode(&canvas, OutputFormat::Png, 90)?;
    /// assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(canvas: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let (width, height) = canvas.dimensions();
        let mut buffer = Vec::new();

        match format {
            OutputFormat::Png => {
                PngEncoder::new(&mut buffer)
                    .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| ReframeError::encode(format!("PNG encoding failed: {e}")))?;
            },
            OutputFormat::Jpeg => {
                // Alpha is dropped; the canvas was filled opaque before compositing
                let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| ReframeError::encode(format!("JPEG encoding failed: {e}")))?;
            },
            OutputFormat::WebP => {
                let encoder = webp::Encoder::from_rgba(canvas.as_raw(), width, height);
                let memory = encoder
                    .encode_simple(false, f32::from(quality.min(100)))
                    .map_err(|e| ReframeError::encode(format!("WebP encoding failed: {e:?}")))?;
                buffer.extend_from_slice(&memory);
            },
        }

        Ok(buffer)
    }

    /// Get the file extension for a format (without the dot)
    ///
    /// # Examples
    /// ```rust
    /// use imgly_reframe::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP => true,
            OutputFormat::Jpeg => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128, 255])
        })
    }

    #[test]
    fn test_encode_png_preserves_alpha() {
        let mut canvas = gradient(16, 8);
        canvas.put_pixel(0, 0, Rgba([1, 2, 3, 0]));
        let bytes = OutputFormatHandler::encode(&canvas, OutputFormat::Png, 0).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded, canvas);
    }

    #[test]
    fn test_encode_jpeg() {
        let canvas = gradient(32, 24);
        let bytes = OutputFormatHandler::encode(&canvas, OutputFormat::Jpeg, 85).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8]));

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let canvas = gradient(64, 64);
        let low = OutputFormatHandler::encode(&canvas, OutputFormat::Jpeg, 10).unwrap();
        let high = OutputFormatHandler::encode(&canvas, OutputFormat::Jpeg, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_jpeg_quality_zero_is_accepted() {
        let canvas = gradient(8, 8);
        assert!(OutputFormatHandler::encode(&canvas, OutputFormat::Jpeg, 0).is_ok());
    }

    #[test]
    fn test_encode_webp() {
        let canvas = gradient(20, 10);
        let bytes = OutputFormatHandler::encode(&canvas, OutputFormat::WebP, 80).unwrap();
        assert_eq!(bytes.get(0..4), Some(&b"RIFF"[..]));
        assert_eq!(bytes.get(8..12), Some(&b"WEBP"[..]));

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::WebP), "webp");
    }

    #[test]
    fn test_supports_transparency() {
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::WebP));
        assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
    }
}
