//! Correlation kernels.
//!
//! Both kernels compute the zero-mean normalized cross-correlation surface of
//! a template over every valid top-left placement and keep the single best
//! peak. Ties resolve to the first placement in row-major order.

mod plan;
pub(crate) mod scalar;

#[cfg(feature = "rayon")]
pub(crate) mod rayon;

pub use plan::TemplatePlan;

use crate::util::{SlideMatchResult, SolveError};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Windows whose intensity variance is at or below this are skipped.
    pub min_var_i: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self { min_var_i: 1e-6 }
    }
}

/// Best placement found by a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the template's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the template's top-left corner.
    pub y: usize,
    /// ZNCC score at the placement, approximately in `[-1, 1]`.
    pub score: f64,
}

/// Keeps `candidate` only when strictly better than `best`.
///
/// Callers feed placements in row-major order, so the earliest placement wins
/// ties.
pub(crate) fn keep_better(best: Option<Peak>, candidate: Peak) -> Option<Peak> {
    match best {
        Some(b) if b.score >= candidate.score => Some(b),
        _ => Some(candidate),
    }
}

/// Validates that the template fits and returns the last valid placement.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
) -> SlideMatchResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    if img_width < tpl.width() || img_height < tpl.height() {
        return Err(SolveError::Dimension {
            template_width: tpl.width(),
            template_height: tpl.height(),
            image_width: img_width,
            image_height: img_height,
        });
    }
    Ok((img_width - tpl.width(), img_height - tpl.height()))
}

/// Scores one placement; `None` when the window is flat.
#[inline]
pub(crate) fn score_at(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    x: usize,
    y: usize,
    params: ScanParams,
) -> Option<f64> {
    let tpl_width = tpl.width();
    let zero_mean = tpl.zero_mean();
    let mut dot = 0.0f64;
    let mut sum_i = 0.0f64;
    let mut sum_i2 = 0.0f64;

    for ty in 0..tpl.height() {
        let img_row = image.row(y + ty)?;
        let window = img_row.get(x..x + tpl_width)?;
        let base = ty * tpl_width;
        for (tx, &value) in window.iter().enumerate() {
            let value = f64::from(value);
            dot += zero_mean[base + tx] * value;
            sum_i += value;
            sum_i2 += value * value;
        }
    }

    let var_i = sum_i2 - (sum_i * sum_i) / tpl.count();
    if var_i <= params.min_var_i {
        return None;
    }
    let score = dot / (tpl.var_t() * var_i).sqrt();
    score.is_finite().then_some(score)
}

/// Scans every placement and returns the best peak, dispatching to the
/// row-parallel kernel when requested and available.
pub fn scan_best(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    params: ScanParams,
    parallel: bool,
) -> SlideMatchResult<Peak> {
    #[cfg(feature = "rayon")]
    if parallel {
        return self::rayon::zncc_scan_best_par(image, tpl, params);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    scalar::zncc_scan_best(image, tpl, params)
}
