//! Source/destination rectangle resolution for fit policies
//!
//! All math is done on integers (widened to `u64`) so rectangles never carry
//! partial pixels and always stay inside their image.

use crate::{
    config::FitPolicy,
    error::{ReframeError, Result},
};

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the rectangle lies inside a `width`x`height` image
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Where a source region lands on the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Region of the source image that is drawn
    pub src: Rect,
    /// Region of the canvas it is drawn into
    pub dst: Rect,
}

/// Reject zero-sized dimensions
pub fn validate_dimensions(width: u32, height: u32, context: &'static str) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ReframeError::invalid_dimensions(width, height, context));
    }
    Ok(())
}

/// Compute source and destination rectangles for a fit policy
///
/// # Errors
///
/// Returns `ReframeError::InvalidDimensions` when the source or target has a
/// zero dimension.
pub fn resolve(source: (u32, u32), target: (u32, u32), fit: FitPolicy) -> Result<Placement> {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = target;
    validate_dimensions(src_w, src_h, "source image")?;
    validate_dimensions(dst_w, dst_h, "target canvas")?;

    let placement = match fit {
        FitPolicy::Contain => contain(source, target),
        // TODO: decide whether Crop should anchor differently from Cover; both center today
        FitPolicy::Cover | FitPolicy::Crop => cover(source, target),
    };

    debug_assert!(placement.src.fits_within(src_w, src_h));
    debug_assert!(placement.dst.fits_within(dst_w, dst_h));
    Ok(placement)
}

/// `numerator / denominator` rounded half up, clamped to `1..=max`
fn scaled(value: u32, numerator: u32, denominator: u32, max: u32) -> u32 {
    let num = u64::from(value) * u64::from(numerator);
    let den = u64::from(denominator);
    let rounded = (num + den / 2) / den;
    rounded.clamp(1, u64::from(max)) as u32
}

fn contain((src_w, src_h): (u32, u32), (dst_w, dst_h): (u32, u32)) -> Placement {
    // Compare aspect ratios without division: src_w/src_h >= dst_w/dst_h
    let wider = u64::from(src_w) * u64::from(dst_h) >= u64::from(src_h) * u64::from(dst_w);
    let (content_w, content_h) = if wider {
        (dst_w, scaled(src_h, dst_w, src_w, dst_h))
    } else {
        (scaled(src_w, dst_h, src_h, dst_w), dst_h)
    };

    Placement {
        src: Rect::full(src_w, src_h),
        dst: Rect::new(
            (dst_w - content_w) / 2,
            (dst_h - content_h) / 2,
            content_w,
            content_h,
        ),
    }
}

fn cover((src_w, src_h): (u32, u32), (dst_w, dst_h): (u32, u32)) -> Placement {
    let wider = u64::from(src_w) * u64::from(dst_h) > u64::from(src_h) * u64::from(dst_w);
    let src = if wider {
        let crop_w = scaled(src_h, dst_w, dst_h, src_w);
        Rect::new((src_w - crop_w) / 2, 0, crop_w, src_h)
    } else {
        let crop_h = scaled(src_w, dst_h, dst_w, src_h);
        Rect::new(0, (src_h - crop_h) / 2, src_w, crop_h)
    };

    Placement {
        src,
        dst: Rect::full(dst_w, dst_h),
    }
}
