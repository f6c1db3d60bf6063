//! Canny edge detection without a built-in blur.
//!
//! `imageproc::edges::canny` always smooths with a fixed sigma of 1.4 before
//! taking gradients. Edge maps here must depend on [`EdgeParams::blur_sigma`]
//! alone, so the Sobel, non-maximum suppression and hysteresis stages run
//! directly on the input.
//!
//! [`EdgeParams::blur_sigma`]: super::EdgeParams::blur_sigma

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

const RADIANS_TO_DEGREES: f32 = 180.0 / std::f32::consts::PI;

/// Binary edge map (255 = edge) of `gray`.
///
/// Expects `low <= high`. The one-pixel border never seeds an edge but can be
/// reached by hysteresis.
pub(crate) fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let gx: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f32::from(a.0[0]).hypot(f32::from(b.0[0])))
        .collect();

    let thinned = suppress_non_maxima(&magnitude, &gx, &gy, w as usize, h as usize);
    hysteresis(&thinned, w, h, low, high)
}

/// Keeps pixels whose magnitude is at least that of both neighbours across
/// the quantized gradient direction. Border pixels are zeroed.
fn suppress_non_maxima(
    magnitude: &[f32],
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
    w: usize,
    h: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; magnitude.len()];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let dx = f32::from(gx.get_pixel(x as u32, y as u32).0[0]);
            let dy = f32::from(gy.get_pixel(x as u32, y as u32).0[0]);
            let mut angle = dy.atan2(dx) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            let at = |cx: usize, cy: usize| magnitude[cy * w + cx];
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                (at(x - 1, y), at(x + 1, y))
            } else if angle < 67.5 {
                (at(x + 1, y + 1), at(x - 1, y - 1))
            } else if angle < 112.5 {
                (at(x, y - 1), at(x, y + 1))
            } else {
                (at(x - 1, y + 1), at(x + 1, y - 1))
            };

            let m = at(x, y);
            if m >= a && m >= b {
                out[y * w + x] = m;
            }
        }
    }
    out
}

/// Grows strong edges (`>= high`) through 8-connected weak ones (`>= low`).
fn hysteresis(thinned: &[f32], w: u32, h: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    let mut stack: Vec<(u32, u32)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = (y * w + x) as usize;
            if thinned[idx] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (ox, oy) in NEIGHBOURS {
                    let (Some(nx), Some(ny)) =
                        (cx.checked_add_signed(ox), cy.checked_add_signed(oy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if thinned[nidx] >= low && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, Luma([255]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
