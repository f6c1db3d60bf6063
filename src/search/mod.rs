//! Single-shape matching against a normalized background.
//!
//! [`Matcher::locate`] correlates one shape (template) with one edge map
//! (search space) and reports the best top-left placement. The reported
//! offset can be nudged inward to compensate for outline/edge renderings
//! being wider than the true piece boundary.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::background::NormalizedBackground;
use crate::image::io::save_png;
use crate::kernel::{scan_best, ScanParams, TemplatePlan};
use crate::shape::Shape;
use crate::trace::{trace_event, trace_span};
use crate::util::math::round_to;
use crate::util::{SlideMatchResult, SolveError};
use crate::ImageView;

/// Inward shift applied to reported placements.
///
/// The shift is `min(cap, template_width / divisor)`, rounded to three
/// decimals. Both constants are empirical and deployment-specific.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetCorrection {
    pub cap: f64,
    pub divisor: f64,
}

impl Default for OffsetCorrection {
    fn default() -> Self {
        Self {
            cap: 0.357,
            divisor: 20.0,
        }
    }
}

impl OffsetCorrection {
    /// Shift in pixels for a template of `template_width`.
    pub fn shift(&self, template_width: u32) -> f64 {
        if self.divisor <= 0.0 {
            return 0.0;
        }
        self.cap
            .min(round_to(f64::from(template_width) / self.divisor, 3))
            .max(0.0)
    }
}

/// Matcher configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Inward correction; `None` reports raw placements.
    pub offset_correction: Option<OffsetCorrection>,
    /// Minimum variance of a search window (flat windows are skipped).
    pub min_var_i: f64,
    /// Use the row-parallel kernel when the `rayon` feature is enabled.
    pub parallel: bool,
    /// Fractional digits kept in the reported offset.
    pub round_decimals: u32,
    /// Annotation rectangle colour (RGB).
    pub rectangle_color: [u8; 3],
    /// Annotation rectangle thickness in pixels.
    pub rectangle_thickness: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            offset_correction: Some(OffsetCorrection::default()),
            min_var_i: ScanParams::default().min_var_i,
            parallel: cfg!(feature = "rayon"),
            round_decimals: 3,
            rectangle_color: [255, 0, 0],
            rectangle_thickness: 1,
        }
    }
}

/// Raw top-left placement and template size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Outcome of matching one shape against one background.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    /// Corrected x offset of the placement.
    pub offset_x: f64,
    /// Peak normalized cross-correlation score.
    pub confidence: f64,
    /// Uncorrected placement.
    pub placement: Placement,
    /// Inward shift applied to `offset_x` and to the drawn rectangle.
    pub shift: f64,
}

/// ZNCC matcher for shapes over normalized backgrounds.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the matcher configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Finds the best placement of `shape` inside `background`.
    ///
    /// Fails with [`SolveError::Dimension`] when the shape is larger than the
    /// background in either dimension.
    pub fn locate(
        &self,
        shape: &Shape,
        background: &NormalizedBackground,
    ) -> SlideMatchResult<MatchResult> {
        let _span = trace_span!("locate", width = shape.width(), height = shape.height()).entered();

        let tpl_gray = shape.gray();
        let bg_gray = background.gray();
        if tpl_gray.width() > bg_gray.width() || tpl_gray.height() > bg_gray.height() {
            return Err(SolveError::Dimension {
                template_width: tpl_gray.width() as usize,
                template_height: tpl_gray.height() as usize,
                image_width: bg_gray.width() as usize,
                image_height: bg_gray.height() as usize,
            });
        }

        let plan = TemplatePlan::from_view(ImageView::from_gray(&tpl_gray)?)?;
        let params = ScanParams {
            min_var_i: self.cfg.min_var_i,
        };
        let peak = scan_best(
            ImageView::from_gray(bg_gray)?,
            &plan,
            params,
            self.cfg.parallel,
        )?;

        let shift = self
            .cfg
            .offset_correction
            .map_or(0.0, |c| c.shift(shape.width()));
        let result = MatchResult {
            offset_x: round_to(peak.x as f64 + shift, self.cfg.round_decimals),
            confidence: peak.score,
            placement: Placement {
                x: peak.x as u32,
                y: peak.y as u32,
                width: shape.width(),
                height: shape.height(),
            },
            shift,
        };
        trace_event!(
            "located",
            x = peak.x,
            y = peak.y,
            confidence = peak.score
        );
        Ok(result)
    }

    /// Locates `shape` and writes a copy of `canvas` with the placement
    /// outlined to `output`.
    ///
    /// `canvas` must share the background's geometry; it is never modified.
    pub fn locate_annotated(
        &self,
        shape: &Shape,
        background: &NormalizedBackground,
        canvas: &RgbImage,
        output: &Path,
    ) -> SlideMatchResult<MatchResult> {
        let result = self.locate(shape, background)?;
        let marked = self.annotate(canvas, &result);
        save_png(&marked, output)?;
        Ok(result)
    }

    /// Returns a copy of `canvas` with the (shift-corrected) rectangle drawn.
    pub fn annotate(&self, canvas: &RgbImage, result: &MatchResult) -> RgbImage {
        let mut marked = canvas.clone();
        let p = result.placement;
        let left = (f64::from(p.x) + result.shift) as i32;
        let top = (f64::from(p.y) + result.shift) as i32;
        let right = (f64::from(p.x + p.width) - result.shift) as i32;
        let bottom = (f64::from(p.y + p.height) - result.shift) as i32;
        let color = Rgb(self.cfg.rectangle_color);

        for inset in 0..self.cfg.rectangle_thickness.max(1) as i32 {
            let width = right - left - 2 * inset + 1;
            let height = bottom - top - 2 * inset + 1;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(left + inset, top + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut marked, rect, color);
        }
        marked
    }
}
