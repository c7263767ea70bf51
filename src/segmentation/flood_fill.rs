//! Built-in edge-sampling flood-fill segmenter
//!
//! Estimates the background color from the image border, flood fills from
//! every border pixel through pixels close to that color, and feathers the
//! foreground pixels touching the filled region. Fully transparent pixels
//! are treated as background. Needs no model and runs in O(pixel count) time
//! and memory.

use crate::types::AlphaMask;
use image::RgbaImage;
use std::collections::{HashMap, VecDeque};

/// Euclidean RGB distance below which a pixel counts as background
pub const DEFAULT_TOLERANCE: f32 = 20.0;

/// Coverage kept on foreground pixels bordering the background
pub const EDGE_FEATHER: f32 = 0.5;

/// Per-pixel classification produced by the fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelClass {
    Foreground,
    Background,
    Edge,
}

/// Flood-fill background segmenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodFillSegmenter {
    tolerance: f32,
}

impl Default for FloodFillSegmenter {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl FloodFillSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Segmenter with a custom color tolerance
    #[must_use]
    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    #[must_use]
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Compute the coverage mask for an image
    ///
    /// Background pixels get 0, feathered edges `EDGE_FEATHER`, interior
    /// foreground 1. Multiplying the result into the image's alpha scales
    /// edge alpha to half of its original value.
    #[must_use]
    pub fn segment(&self, image: &RgbaImage) -> AlphaMask {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return AlphaMask::opaque(width, height);
        }

        let background = estimate_background(image);
        let classes = self.classify(image, background);

        let data = classes
            .into_iter()
            .map(|class| match class {
                PixelClass::Background => 0.0,
                PixelClass::Edge => EDGE_FEATHER,
                PixelClass::Foreground => 1.0,
            })
            .collect();

        AlphaMask::from_raw(width, height, data).unwrap_or_else(|| AlphaMask::opaque(width, height))
    }

    fn classify(&self, image: &RgbaImage, background: [u8; 3]) -> Vec<PixelClass> {
        let (width, height) = image.dimensions();
        let (w, h) = (width as usize, height as usize);
        let raw = image.as_raw();
        let threshold_sq = self.tolerance * self.tolerance;

        let matches = |index: usize| -> bool {
            let offset = index * 4;
            match raw.get(offset..offset + 4) {
                Some(&[_, _, _, 0]) => true,
                Some(&[r, g, b, _]) => color_distance_sq([r, g, b], background) < threshold_sq,
                _ => false,
            }
        };

        let mut classes = vec![PixelClass::Foreground; w * h];
        let mut queue = VecDeque::new();

        let mut seed = |index: usize, classes: &mut Vec<PixelClass>| {
            if let Some(class) = classes.get_mut(index) {
                if *class == PixelClass::Foreground && matches(index) {
                    *class = PixelClass::Background;
                    queue.push_back(index);
                }
            }
        };

        for x in 0..w {
            seed(x, &mut classes);
            seed((h - 1) * w + x, &mut classes);
        }
        for y in 0..h {
            seed(y * w, &mut classes);
            seed(y * w + w - 1, &mut classes);
        }

        while let Some(index) = queue.pop_front() {
            let (x, y) = (index % w, index / w);
            for neighbor in neighbors(x, y, w, h).into_iter().flatten() {
                if let Some(class) = classes.get_mut(neighbor) {
                    if *class == PixelClass::Foreground && matches(neighbor) {
                        *class = PixelClass::Background;
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        // Mark foreground pixels touching the background. Edges are written to
        // a separate list so they do not influence their own neighbors.
        let mut edges = Vec::new();
        for (index, class) in classes.iter().enumerate() {
            if *class != PixelClass::Foreground {
                continue;
            }
            let (x, y) = (index % w, index / w);
            let touches_background = neighbors(x, y, w, h)
                .into_iter()
                .flatten()
                .any(|n| classes.get(n) == Some(&PixelClass::Background));
            if touches_background {
                edges.push(index);
            }
        }
        for index in edges {
            if let Some(class) = classes.get_mut(index) {
                *class = PixelClass::Edge;
            }
        }

        classes
    }
}

/// 4-connected neighbor indices, `None` past the image edge
fn neighbors(x: usize, y: usize, w: usize, h: usize) -> [Option<usize>; 4] {
    let index = y * w + x;
    [
        (x > 0).then(|| index - 1),
        (x + 1 < w).then(|| index + 1),
        (y > 0).then(|| index - w),
        (y + 1 < h).then(|| index + w),
    ]
}

fn color_distance_sq(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| {
            let d = f32::from(p) - f32::from(q);
            d * d
        })
        .sum()
}

/// Most frequent exact RGB value along the border
///
/// Scans the full top row, full bottom row, full left column and full right
/// column in that order. Ties go to the color seen first. Fully transparent
/// pixels are not counted; black is returned when nothing is left, including
/// for empty images.
#[must_use]
pub fn estimate_background(image: &RgbaImage) -> [u8; 3] {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return [0, 0, 0];
    }

    let visible_rgb = |x: u32, y: u32| {
        let p = image.get_pixel(x, y);
        (p[3] > 0).then_some([p[0], p[1], p[2]])
    };

    let border = (0..width)
        .map(|x| visible_rgb(x, 0))
        .chain((0..width).map(|x| visible_rgb(x, height - 1)))
        .chain((0..height).map(|y| visible_rgb(0, y)))
        .chain((0..height).map(|y| visible_rgb(width - 1, y)))
        .flatten();

    // color -> (count, first-seen order)
    let mut counts: HashMap<[u8; 3], (usize, usize)> = HashMap::new();
    for (order, color) in border.enumerate() {
        counts.entry(color).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, order_a)), (_, (count_b, order_b))| {
            count_a.cmp(count_b).then(order_b.cmp(order_a))
        })
        .map_or([0, 0, 0], |(color, _)| color)
}
