//! Foreground masks: Otsu binarization, external-contour filling, and
//! near-white (HSV) content detection.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use palette::{FromColor, Hsv, Srgb};

use crate::preprocess::Bounds;

const ON: Luma<u8> = Luma([255]);

/// Binarizes with the level that maximizes between-class variance.
///
/// Pixels strictly above the Otsu level become 255; `invert` swaps the
/// classes so dark content becomes foreground.
pub fn otsu_binarize(gray: &GrayImage, invert: bool) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let above = gray.get_pixel(x, y).0[0] > level;
        if above != invert {
            ON
        } else {
            Luma([0])
        }
    })
}

/// Outermost borders of every foreground component.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Fills the external contours of `binary` into a solid mask.
///
/// Interior holes are closed. Returns `None` when there is no foreground.
pub fn fill_external(binary: &GrayImage) -> Option<GrayImage> {
    let contours = external_contours(binary);
    if contours.is_empty() {
        return None;
    }

    let (width, height) = binary.dimensions();
    let mut mask = GrayImage::new(width, height);
    for contour in &contours {
        let mut poly: Vec<Point<i32>> = Vec::with_capacity(contour.points.len());
        for &p in &contour.points {
            if poly.last() != Some(&p) {
                poly.push(p);
            }
        }
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() >= 3 {
            draw_polygon_mut(&mut mask, &poly, ON);
        }
    }
    // Contour pixels themselves, plus thin parts the polygon fill skips.
    for (x, y, px) in binary.enumerate_pixels() {
        if px.0[0] > 0 {
            mask.put_pixel(x, y, ON);
        }
    }
    Some(mask)
}

/// Marks pixels that are NOT near-white.
///
/// A pixel is near-white when its HSV value is at least `255 - threshold`
/// and its saturation at most `threshold` (both on a 0..=255 scale); hue is
/// ignored.
pub fn near_white_content_mask(img: &RgbImage, threshold: u8) -> GrayImage {
    let t = f32::from(threshold);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
        let value = hsv.value * 255.0;
        let saturation = hsv.saturation * 255.0;
        let white = value + 1e-3 >= 255.0 - t && saturation <= t + 1e-3;
        if white {
            Luma([0])
        } else {
            ON
        }
    })
}

/// Union bounding box of every external contour in the content mask,
/// grown by `padding`.
///
/// Returns `None` when the image holds only near-white pixels.
pub fn whitespace_bounds(img: &RgbImage, threshold: u8, padding: u32) -> Option<Bounds> {
    let content = near_white_content_mask(img, threshold);
    let bounds = external_contours(&content)
        .iter()
        .filter_map(contour_bounds)
        .reduce(Bounds::union)?;
    let padded = bounds.padded(padding, img.width(), img.height());
    (!padded.is_empty()).then_some(padded)
}

/// Tight bounding box of all non-zero pixels.
pub fn foreground_bounds(mask: &GrayImage) -> Option<Bounds> {
    let mut found: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in mask.enumerate_pixels() {
        if px.0[0] == 0 {
            continue;
        }
        found = Some(match found {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    found.map(|(x0, y0, x1, y1)| Bounds::from_corners(x0, y0, x1, y1))
}

fn contour_bounds(contour: &Contour<i32>) -> Option<Bounds> {
    let first = contour.points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    if x0 < 0 || y0 < 0 {
        return None;
    }
    Some(Bounds::from_corners(x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}
