//! Rounded-rectangle corner mask

use crate::types::AlphaMask;

/// Build a hard-edged rounded-rectangle mask
///
/// `radius` is clamped to half the shorter edge. A pixel is inside when its
/// center lies within the rounded rectangle; inside pixels get coverage 1,
/// everything else 0.
#[must_use]
pub fn corner_mask(width: u32, height: u32, radius: u32) -> AlphaMask {
    let radius = radius.min(width.min(height) / 2);
    if radius == 0 {
        return AlphaMask::opaque(width, height);
    }

    let r = radius as f32;
    let (w, h) = (width as f32, height as f32);
    let r_sq = r * r;

    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let py = y as f32 + 0.5;
        // Nearest point on the inner (radius-inset) rectangle
        let cy = py.clamp(r, h - r);
        for x in 0..width {
            let px = x as f32 + 0.5;
            let cx = px.clamp(r, w - r);
            let (dx, dy) = (px - cx, py - cy);
            data.push(if dx * dx + dy * dy <= r_sq { 1.0 } else { 0.0 });
        }
    }

    AlphaMask::from_raw(width, height, data).unwrap_or_else(|| AlphaMask::opaque(width, height))
}
