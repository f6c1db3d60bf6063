//! Shared raster operations used by shape extraction and background
//! normalization.
//!
//! Everything here is pure: each function takes borrowed pixels and returns a
//! new image, so identical inputs always produce identical outputs.

mod canny;
pub mod edges;
pub mod mask;

pub use edges::{edge_map, edge_map_gray, EdgeParams};
pub use mask::{
    fill_external, foreground_bounds, near_white_content_mask, otsu_binarize, whitespace_bounds,
};

use image::{GrayImage, RgbImage};

/// Axis-aligned pixel rectangle, `x`/`y` at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Rectangle spanning the inclusive corners `(x0, y0)`..=`(x1, y1)`.
    pub fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        }
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(self, other: Bounds) -> Bounds {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Bounds {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Grows the rectangle by `padding` on every side, clamped to the image.
    pub fn padded(self, padding: u32, img_width: u32, img_height: u32) -> Bounds {
        let x0 = self.x.saturating_sub(padding);
        let y0 = self.y.saturating_sub(padding);
        let x1 = (self.x + self.width).saturating_add(padding).min(img_width);
        let y1 = (self.y + self.height).saturating_add(padding).min(img_height);
        Bounds {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    /// Returns true when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Converts to single-channel intensity.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Replicates a single-channel image into three identical channels.
pub fn gray_to_rgb(img: &GrayImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y).0[0];
        image::Rgb([v, v, v])
    })
}

/// Copies the pixels inside `bounds` into a new image.
///
/// Empty bounds leave the image unmodified.
pub fn crop_rgb(img: &RgbImage, bounds: Bounds) -> RgbImage {
    if bounds.is_empty() {
        return img.clone();
    }
    image::imageops::crop_imm(img, bounds.x, bounds.y, bounds.width, bounds.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::{crop_rgb, Bounds};
    use image::{Rgb, RgbImage};

    #[test]
    fn padding_clamps_to_image() {
        let b = Bounds::from_corners(2, 3, 5, 6);
        assert_eq!((b.width, b.height), (4, 4));
        let padded = b.padded(5, 8, 20);
        assert_eq!(
            padded,
            Bounds {
                x: 0,
                y: 0,
                width: 8,
                height: 12
            }
        );
    }

    #[test]
    fn union_covers_both() {
        let a = Bounds::from_corners(1, 1, 2, 2);
        let b = Bounds::from_corners(5, 0, 6, 1);
        assert_eq!(a.union(b), Bounds::from_corners(1, 0, 6, 2));
    }

    #[test]
    fn crop_copies_region() {
        let img = RgbImage::from_fn(6, 4, |x, y| Rgb([x as u8, y as u8, 0]));
        let out = crop_rgb(&img, Bounds::from_corners(2, 1, 3, 2));
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([2, 1, 0]));
        assert_eq!(out.get_pixel(1, 1), &Rgb([3, 2, 0]));
    }
}
