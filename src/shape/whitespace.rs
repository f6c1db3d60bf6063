//! Whitespace crop followed by edge detection.

use image::RgbImage;

use crate::preprocess::{
    crop_rgb, edge_map_gray, foreground_bounds, gray_to_rgb, whitespace_bounds, EdgeParams,
};
use crate::shape::Shape;
use crate::util::{SlideMatchResult, SolveError};

pub(super) fn extract(
    gap: &RgbImage,
    white_threshold: u8,
    padding: u32,
    edges: &EdgeParams,
) -> SlideMatchResult<Shape> {
    // Best effort: an all-white canvas is processed uncropped.
    let cropped = match whitespace_bounds(gap, white_threshold, padding) {
        Some(bounds) => crop_rgb(gap, bounds),
        None => gap.clone(),
    };
    let edge_map = edge_map_gray(&cropped, edges);
    let tight = foreground_bounds(&edge_map).ok_or(SolveError::Extraction {
        reason: "no edges found in gap image",
    })?;
    Shape::new(crop_rgb(&gray_to_rgb(&edge_map), tight))
}
