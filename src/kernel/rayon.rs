//! Rayon row-parallel kernel (feature-gated).
//!
//! Each row is scanned on its own thread; the per-row winners are reduced in
//! row order so tie-breaking matches the scalar kernel exactly.

use crate::kernel::{keep_better, placement_range, score_at, Peak, ScanParams, TemplatePlan};
use crate::util::{SlideMatchResult, SolveError};
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel variant of the scalar best-peak scan.
pub(crate) fn zncc_scan_best_par(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    params: ScanParams,
) -> SlideMatchResult<Peak> {
    let (max_x, max_y) = placement_range(image, tpl)?;
    let row_best: Vec<Option<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut best = None;
            for x in 0..=max_x {
                if let Some(score) = score_at(image, tpl, x, y, params) {
                    best = keep_better(best, Peak { x, y, score });
                }
            }
            best
        })
        .collect();

    row_best
        .into_iter()
        .flatten()
        .fold(None, keep_better)
        .ok_or(SolveError::NoPlacement)
}

#[cfg(test)]
mod tests {
    use super::zncc_scan_best_par;
    use crate::kernel::scalar::zncc_scan_best;
    use crate::kernel::{ScanParams, TemplatePlan};
    use crate::ImageView;

    #[test]
    fn parallel_scan_matches_scalar() {
        let (w, h) = (31, 23);
        let image: Vec<u8> = (0..w * h).map(|i| ((i * 7919) % 251) as u8).collect();
        let tpl: Vec<u8> = (0..25).map(|i| ((i * 31) % 200) as u8).collect();
        let view = ImageView::from_slice(&image, w, h).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 5, 5).unwrap()).unwrap();
        let a = zncc_scan_best(view, &plan, ScanParams::default()).unwrap();
        let b = zncc_scan_best_par(view, &plan, ScanParams::default()).unwrap();
        assert_eq!(a, b);
    }
}
