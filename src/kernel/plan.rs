//! Template plan precomputation for ZNCC.

use crate::image::ImageView;
use crate::util::{SlideMatchResult, SolveError};

/// Precomputed statistics and zero-mean buffer for template matching.
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f64,
    var_t: f64,
    zero_mean: Vec<f64>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> SlideMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(SolveError::InvalidDimensions { width, height })?;

        let mut values = Vec::with_capacity(count);
        for y in 0..height {
            let row = tpl.row(y).ok_or(SolveError::BufferTooSmall {
                needed: count,
                got: values.len(),
            })?;
            values.extend(row.iter().map(|&v| f64::from(v)));
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let zero_mean: Vec<f64> = values.iter().map(|v| v - mean).collect();
        let var_t: f64 = zero_mean.iter().map(|v| v * v).sum();
        if var_t <= 1e-8 {
            return Err(SolveError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            mean,
            var_t,
            zero_mean,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the sum of squared deviations from the mean.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }

    pub(crate) fn count(&self) -> f64 {
        (self.width * self.height) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::util::SolveError;
    use crate::ImageView;

    #[test]
    fn plan_matches_known_stats() {
        let data = [0u8, 1, 2, 3];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&data, 2, 2).unwrap()).unwrap();
        assert!((plan.mean() - 1.5).abs() < 1e-12);
        assert!((plan.var_t() - 5.0).abs() < 1e-12);
        assert_eq!(plan.zero_mean(), &[-1.5, -0.5, 0.5, 1.5]);
    }

    #[test]
    fn plan_rejects_flat_templates() {
        let data = [7u8; 6];
        let err = TemplatePlan::from_view(ImageView::from_slice(&data, 3, 2).unwrap())
            .err()
            .unwrap();
        assert_eq!(
            err,
            SolveError::DegenerateTemplate {
                reason: "zero variance"
            }
        );
    }
}
