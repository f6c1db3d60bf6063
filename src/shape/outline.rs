//! Thin-outline extraction.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

use crate::preprocess::{
    crop_rgb, fill_external, foreground_bounds, gray_to_rgb, otsu_binarize, to_gray,
};
use crate::shape::Shape;
use crate::util::{SlideMatchResult, SolveError};

/// Otsu → filled external contour → mask minus its erosion → tight crop.
///
/// The ring keeps only the silhouette of the piece; interior texture never
/// reaches the matcher.
pub(super) fn extract(gap: &RgbImage, erode_iterations: u8) -> SlideMatchResult<Shape> {
    let gray = to_gray(gap);
    let binary = otsu_binarize(&gray, false);
    let mask = fill_external(&binary).ok_or(SolveError::Extraction {
        reason: "no contour found in gap image",
    })?;

    // LInf distance k is equivalent to k successive 3x3 erosions.
    let eroded = imageproc::morphology::erode(&mask, Norm::LInf, erode_iterations);
    let ring = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let m = mask.get_pixel(x, y).0[0];
        let e = eroded.get_pixel(x, y).0[0];
        Luma([m.saturating_sub(e)])
    });

    let bounds = foreground_bounds(&ring).ok_or(SolveError::Extraction {
        reason: "outline empty after erosion",
    })?;
    Shape::new(crop_rgb(&gray_to_rgb(&ring), bounds))
}

#[cfg(test)]
mod tests {
    use super::extract;
    use crate::util::SolveError;
    use image::{Rgb, RgbImage};

    fn square_gap(size: u32, x0: u32, y0: u32, side: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                // Textured interior must not leak into the outline.
                Rgb([200 + (x % 3) as u8 * 10, 210, 190 + (y % 5) as u8 * 5])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn outline_is_a_ring_cropped_to_the_piece() {
        let shape = extract(&square_gap(60, 15, 20, 30), 2).unwrap();
        assert_eq!((shape.width(), shape.height()), (30, 30));

        let img = shape.image();
        // Border and 1px inside are set; interior is clear.
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(1, 15).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(15, 15).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(3, 15).0, [0, 0, 0]);
    }

    #[test]
    fn blank_gap_is_an_extraction_error() {
        let err = extract(&RgbImage::new(20, 20), 2).unwrap_err();
        assert!(matches!(err, SolveError::Extraction { .. }));
    }

    #[test]
    fn full_frame_piece_leaves_no_ring() {
        let gap = RgbImage::from_pixel(12, 12, Rgb([255, 255, 255]));
        let err = extract(&gap, 2).unwrap_err();
        assert!(matches!(err, SolveError::Extraction { .. }));
    }
}
