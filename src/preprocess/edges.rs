//! Blur + Canny edge maps.
//!
//! The Gaussian blur controlled by [`EdgeParams::blur_sigma`] is the only
//! smoothing applied; the Canny stage itself takes gradients of its input
//! as is.
//!
//! Thresholds differ between captcha providers, so they are plain
//! configuration values rather than derived from the image.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::preprocess::canny::canny;
use crate::preprocess::{gray_to_rgb, to_gray};

/// Minimum allowed Canny threshold.
///
/// A zero low threshold turns every non-flat pixel into an edge candidate.
pub const MIN_THRESHOLD: f32 = 1.0;

/// Edge detector parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeParams {
    /// Gaussian sigma applied before Canny; `<= 0` disables the blur.
    /// The default corresponds to a 3x3 kernel.
    pub blur_sigma: f32,
    /// Hysteresis low threshold.
    pub low_threshold: f32,
    /// Hysteresis high threshold.
    pub high_threshold: f32,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

impl EdgeParams {
    /// Canny only, thresholds 100/200.
    pub fn sharp() -> Self {
        Self {
            blur_sigma: 0.0,
            low_threshold: 100.0,
            high_threshold: 200.0,
        }
    }
}

/// Computes a binary edge map (255 = edge) of a color image.
pub fn edge_map_gray(img: &RgbImage, params: &EdgeParams) -> GrayImage {
    let gray = to_gray(img);
    let smoothed = if params.blur_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&gray, params.blur_sigma)
    } else {
        gray
    };
    let high = params.high_threshold.max(MIN_THRESHOLD);
    let low = params.low_threshold.max(MIN_THRESHOLD).min(high);
    canny(&smoothed, low, high)
}

/// Computes the edge map and expands it back to three channels.
pub fn edge_map(img: &RgbImage, params: &EdgeParams) -> RgbImage {
    gray_to_rgb(&edge_map_gray(img, params))
}
