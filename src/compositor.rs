//! Canvas compositing
//!
//! Crops and scales the source according to a [`Placement`] and draws it onto
//! a freshly allocated canvas.

use crate::geometry::Placement;
use image::{
    imageops::{self, FilterType},
    Rgba, RgbaImage,
};

/// Fill used for JPEG output, which cannot carry transparency
pub const OPAQUE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Canvas background before the source is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasFill {
    /// Fully transparent; source pixels are copied as-is
    Transparent,
    /// Opaque color; source pixels are alpha-blended over it
    Opaque(Rgba<u8>),
}

/// Draw `source` onto a `canvas_size` canvas
#[must_use]
pub fn composite(
    source: &RgbaImage,
    placement: &Placement,
    canvas_size: (u32, u32),
    fill: CanvasFill,
) -> RgbaImage {
    let src = placement.src;
    let dst = placement.dst;

    let cropped = imageops::crop_imm(source, src.x, src.y, src.width, src.height).to_image();
    let scaled = if (src.width, src.height) == (dst.width, dst.height) {
        cropped
    } else {
        imageops::resize(&cropped, dst.width, dst.height, FilterType::Lanczos3)
    };

    let (x, y) = (i64::from(dst.x), i64::from(dst.y));
    match fill {
        CanvasFill::Transparent => {
            let mut canvas = RgbaImage::new(canvas_size.0, canvas_size.1);
            imageops::replace(&mut canvas, &scaled, x, y);
            canvas
        },
        CanvasFill::Opaque(color) => {
            let mut canvas = RgbaImage::from_pixel(canvas_size.0, canvas_size.1, color);
            imageops::overlay(&mut canvas, &scaled, x, y);
            canvas
        },
    }
}

/// Blend a canvas over an opaque fill, leaving every pixel fully opaque
///
/// Needed before encoding to formats without an alpha channel, so that
/// masked-out pixels show the fill instead of their hidden color.
pub fn flatten(canvas: &mut RgbaImage, fill: Rgba<u8>) {
    for pixel in canvas.pixels_mut() {
        let alpha = u32::from(pixel[3]);
        if alpha == 255 {
            continue;
        }
        for channel in 0..3 {
            let fg = u32::from(pixel[channel]);
            let bg = u32::from(fill[channel]);
            pixel[channel] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
        }
        pixel[3] = 255;
    }
}
