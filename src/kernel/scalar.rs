//! Scalar reference kernel.

use crate::kernel::{keep_better, placement_range, score_at, Peak, ScanParams, TemplatePlan};
use crate::util::{SlideMatchResult, SolveError};
use crate::ImageView;

/// Scans all placements row by row and returns the best ZNCC peak.
pub(crate) fn zncc_scan_best(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    params: ScanParams,
) -> SlideMatchResult<Peak> {
    let (max_x, max_y) = placement_range(image, tpl)?;
    let mut best = None;
    for y in 0..=max_y {
        for x in 0..=max_x {
            if let Some(score) = score_at(image, tpl, x, y, params) {
                best = keep_better(best, Peak { x, y, score });
            }
        }
    }
    best.ok_or(SolveError::NoPlacement)
}

#[cfg(test)]
mod tests {
    use super::zncc_scan_best;
    use crate::kernel::{ScanParams, TemplatePlan};
    use crate::util::SolveError;
    use crate::ImageView;

    fn pattern(width: usize, height: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        data
    }

    #[test]
    fn scan_matches_bruteforce() {
        let (img_w, img_h) = (9, 7);
        let image = pattern(img_w, img_h);
        let tpl: Vec<u8> = (0..6).map(|i| (i * 37 % 251) as u8).collect();
        let view = ImageView::from_slice(&image, img_w, img_h).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 2).unwrap()).unwrap();
        let best = zncc_scan_best(view, &plan, ScanParams::default()).unwrap();

        let mut expected = (0, 0, f64::NEG_INFINITY);
        for y in 0..=(img_h - 2) {
            for x in 0..=(img_w - 3) {
                let mut window = Vec::new();
                for ty in 0..2 {
                    for tx in 0..3 {
                        window.push(f64::from(image[(y + ty) * img_w + x + tx]));
                    }
                }
                let t: Vec<f64> = tpl.iter().map(|&v| f64::from(v)).collect();
                let mt = t.iter().sum::<f64>() / 6.0;
                let mi = window.iter().sum::<f64>() / 6.0;
                let num: f64 = t.iter().zip(&window).map(|(a, b)| (a - mt) * (b - mi)).sum();
                let dt: f64 = t.iter().map(|a| (a - mt).powi(2)).sum();
                let di: f64 = window.iter().map(|b| (b - mi).powi(2)).sum();
                if di <= 1e-6 {
                    continue;
                }
                let score = num / (dt * di).sqrt();
                if score > expected.2 {
                    expected = (x, y, score);
                }
            }
        }
        assert_eq!((best.x, best.y), (expected.0, expected.1));
        assert!((best.score - expected.2).abs() < 1e-9);
    }

    #[test]
    fn exact_copy_scores_one() {
        let (img_w, img_h) = (20, 12);
        let image = pattern(img_w, img_h);
        let mut tpl = Vec::new();
        for y in 4..9 {
            tpl.extend_from_slice(&image[y * img_w + 6..y * img_w + 13]);
        }
        let view = ImageView::from_slice(&image, img_w, img_h).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 7, 5).unwrap()).unwrap();
        let best = zncc_scan_best(view, &plan, ScanParams::default()).unwrap();
        assert_eq!((best.x, best.y), (6, 4));
        assert!((best.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_template_is_a_dimension_error() {
        let image = [0u8; 12];
        let tpl: Vec<u8> = (0..20).collect();
        let view = ImageView::from_slice(&image, 4, 3).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 5, 4).unwrap()).unwrap();
        let err = zncc_scan_best(view, &plan, ScanParams::default()).unwrap_err();
        assert_eq!(
            err,
            SolveError::Dimension {
                template_width: 5,
                template_height: 4,
                image_width: 4,
                image_height: 3,
            }
        );
    }

    #[test]
    fn flat_search_image_has_no_placement() {
        let image = [9u8; 30];
        let tpl = [0u8, 255, 0, 255];
        let view = ImageView::from_slice(&image, 6, 5).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        assert_eq!(
            zncc_scan_best(view, &plan, ScanParams::default()).unwrap_err(),
            SolveError::NoPlacement
        );
    }
}
