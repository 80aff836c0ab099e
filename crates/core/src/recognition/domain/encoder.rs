//! The placeholder encoding scheme: a face patch in 8-bit grayscale, resized
//! to a canonical square and flattened to floats.
//!
//! Deliberately weak: pixel intensities, not a trained embedding. The exact
//! arithmetic (BT.601 grayscale, bilinear resize, row-major flatten) is the
//! compatibility contract; accuracy is not.

use image::{imageops, GrayImage};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::shared::constants::CANONICAL_PATCH_SIZE;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Fixed-length face descriptor. Two encodings are comparable only when they
/// came from the same scheme and patch resolution (the lengths match).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(Vec<f32>);

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    // BT.601 weights, the same conversion the enrollment photos go through.
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

/// 8-bit luma plane of a frame, shaped `(height, width)`.
pub fn grayscale(frame: &Frame) -> Array2<u8> {
    let rgb = frame.as_ndarray();
    Array2::from_shape_fn(
        (frame.height() as usize, frame.width() as usize),
        |(row, col)| luma(rgb[[row, col, 0]], rgb[[row, col, 1]], rgb[[row, col, 2]]),
    )
}

/// Encodes one face region out of a luma plane.
///
/// Returns `None` when the region does not intersect the plane at all.
pub fn encode_gray_region(gray: &Array2<u8>, region: &FaceRegion) -> Option<Encoding> {
    let (height, width) = gray.dim();
    let visible = region.clamped(width as u32, height as u32)?;

    let y0 = visible.y as usize;
    let x0 = visible.x as usize;
    let patch = gray.slice(s![
        y0..y0 + visible.height as usize,
        x0..x0 + visible.width as usize
    ]);

    let raw: Vec<u8> = patch.iter().copied().collect();
    let patch_image = GrayImage::from_raw(visible.width as u32, visible.height as u32, raw)?;
    Some(encode_patch(&patch_image))
}

/// Convenience wrapper for single-region callers (enrollment).
pub fn encode_region(frame: &Frame, region: &FaceRegion) -> Option<Encoding> {
    encode_gray_region(&grayscale(frame), region)
}

/// Canonical-size resize and flatten.
pub fn encode_patch(patch: &GrayImage) -> Encoding {
    let resized = imageops::resize(
        patch,
        CANONICAL_PATCH_SIZE,
        CANONICAL_PATCH_SIZE,
        imageops::FilterType::Triangle,
    );
    Encoding(resized.into_raw().into_iter().map(f32::from).collect())
}
