//! Background normalization: turn the raw scene into an edge map that is
//! comparable with extracted shapes.
//!
//! Every strategy reduces to a [`NormalizeConfig`] pipeline:
//! optional resize, background removal, blur + Canny, optional whitespace
//! re-crop. Geometric steps (resize, crops) are mirrored onto a display
//! canvas so annotations drawn on it line up with matched placements.

use image::imageops::FilterType;
use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::preprocess::{
    crop_rgb, edge_map, fill_external, otsu_binarize, to_gray, whitespace_bounds, EdgeParams,
};
use crate::shape::{default_padding, default_white_threshold};
use crate::trace::{trace_event, trace_span};
use crate::util::{SlideMatchResult, SolveError};

/// Canonical width used by the resize strategy.
pub const CANONICAL_WIDTH: u32 = 296;
/// Canonical height used by the resize strategy.
pub const CANONICAL_HEIGHT: u32 = 200;

/// Background after normalization.
#[derive(Clone, Debug)]
pub struct NormalizedBackground {
    edges: RgbImage,
    display: RgbImage,
    gray: GrayImage,
}

impl NormalizedBackground {
    /// Edge map searched by the matcher (3 identical channels).
    pub fn edges(&self) -> &RgbImage {
        &self.edges
    }

    /// Raw-colour canvas with the same geometry as [`Self::edges`].
    pub fn display(&self) -> &RgbImage {
        &self.display
    }

    /// Single-channel edge map used as the correlation search space.
    ///
    /// Converted once at construction and shared by every match.
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Builds a background from an edge map and a matching display canvas.
    pub fn from_parts(edges: RgbImage, display: RgbImage) -> SlideMatchResult<Self> {
        if edges.dimensions() != display.dimensions() {
            return Err(SolveError::InvalidDimensions {
                width: display.width() as usize,
                height: display.height() as usize,
            });
        }
        let gray = to_gray(&edges);
        Ok(Self {
            edges,
            display,
            gray,
        })
    }
}

/// Near-white detection settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitespaceCrop {
    pub white_threshold: u8,
    pub padding: u32,
}

impl Default for WhitespaceCrop {
    fn default() -> Self {
        Self {
            white_threshold: default_white_threshold(),
            padding: default_padding(),
        }
    }
}

/// How the scene behind the gap is suppressed before edge detection.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Removal {
    /// Leave pixels untouched.
    #[default]
    Keep,
    /// Otsu on the inverted intensity, fill external contours, mask.
    Otsu,
    /// Crop to the union box of non-white content.
    NearWhite(WhitespaceCrop),
}

/// Fully explicit normalization pipeline.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Target `[width, height]` for an area-style resize.
    pub resize: Option<[u32; 2]>,
    pub removal: Removal,
    pub edges: EdgeParams,
    /// Whitespace crop applied to the edge map.
    pub recrop: Option<WhitespaceCrop>,
}

/// Converts a raw background into a [`NormalizedBackground`].
pub trait BackgroundNormalizer {
    fn normalize(&self, raw: &RgbImage) -> SlideMatchResult<NormalizedBackground>;
}

/// Selects a background normalization pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundStrategy {
    /// Content-preserving background removal, light blur, Canny 50/150.
    ContentMask {
        #[serde(default)]
        edges: EdgeParams,
    },
    /// Resize to the canonical geometry, Canny 100/200, whitespace re-crop.
    ResizeCrop {
        #[serde(default = "canonical_width")]
        width: u32,
        #[serde(default = "canonical_height")]
        height: u32,
        #[serde(default)]
        crop: WhitespaceCrop,
        #[serde(default = "EdgeParams::sharp")]
        edges: EdgeParams,
    },
    /// Caller-assembled pipeline.
    Custom(NormalizeConfig),
}

fn canonical_width() -> u32 {
    CANONICAL_WIDTH
}

fn canonical_height() -> u32 {
    CANONICAL_HEIGHT
}

impl Default for BackgroundStrategy {
    fn default() -> Self {
        Self::ContentMask {
            edges: EdgeParams::default(),
        }
    }
}

impl BackgroundStrategy {
    /// Resize strategy with the canonical geometry.
    pub fn resize_crop() -> Self {
        Self::ResizeCrop {
            width: CANONICAL_WIDTH,
            height: CANONICAL_HEIGHT,
            crop: WhitespaceCrop::default(),
            edges: EdgeParams::sharp(),
        }
    }

    /// Expands the strategy into its explicit pipeline.
    pub fn config(&self) -> NormalizeConfig {
        match self {
            Self::ContentMask { edges } => NormalizeConfig {
                resize: None,
                removal: Removal::Otsu,
                edges: *edges,
                recrop: None,
            },
            Self::ResizeCrop {
                width,
                height,
                crop,
                edges,
            } => NormalizeConfig {
                resize: Some([*width, *height]),
                removal: Removal::Keep,
                edges: *edges,
                recrop: Some(*crop),
            },
            Self::Custom(cfg) => cfg.clone(),
        }
    }
}

impl BackgroundNormalizer for BackgroundStrategy {
    fn normalize(&self, raw: &RgbImage) -> SlideMatchResult<NormalizedBackground> {
        self.config().normalize(raw)
    }
}

impl BackgroundNormalizer for NormalizeConfig {
    fn normalize(&self, raw: &RgbImage) -> SlideMatchResult<NormalizedBackground> {
        let _span =
            trace_span!("normalize_background", width = raw.width(), height = raw.height())
                .entered();

        let mut display = match self.resize {
            Some([width, height]) => {
                if width == 0 || height == 0 {
                    return Err(SolveError::InvalidDimensions {
                        width: width as usize,
                        height: height as usize,
                    });
                }
                image::imageops::resize(raw, width, height, FilterType::Triangle)
            }
            None => raw.clone(),
        };

        let content = match self.removal {
            Removal::Keep => display.clone(),
            Removal::Otsu => remove_background_otsu(&display),
            Removal::NearWhite(crop) => {
                let bounds = whitespace_bounds(&display, crop.white_threshold, crop.padding);
                if let Some(bounds) = bounds {
                    display = crop_rgb(&display, bounds);
                }
                display.clone()
            }
        };

        let mut edges = edge_map(&content, &self.edges);
        if let Some(crop) = self.recrop {
            if let Some(bounds) = whitespace_bounds(&edges, crop.white_threshold, crop.padding) {
                edges = crop_rgb(&edges, bounds);
                display = crop_rgb(&display, bounds);
            }
        }

        trace_event!(
            "background_normalized",
            width = edges.width(),
            height = edges.height()
        );
        NormalizedBackground::from_parts(edges, display)
    }
}

/// Keeps only pixels inside the filled external contours of the dark
/// (inverted Otsu) content; everything else becomes black.
fn remove_background_otsu(img: &RgbImage) -> RgbImage {
    let binary = otsu_binarize(&to_gray(img), true);
    let Some(mask) = fill_external(&binary) else {
        return RgbImage::new(img.width(), img.height());
    };
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 {
            *img.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> RgbImage {
        RgbImage::from_fn(120, 80, |x, y| {
            if (40..70).contains(&x) && (20..50).contains(&y) {
                Rgb([110, 110, 110])
            } else {
                Rgb([180 + (x % 7) as u8, 170, 150 + (y % 3) as u8])
            }
        })
    }

    #[test]
    fn content_mask_keeps_geometry() {
        let bg = BackgroundStrategy::default().normalize(&scene()).unwrap();
        assert_eq!(bg.edges().dimensions(), (120, 80));
        assert_eq!(bg.display().dimensions(), (120, 80));
        assert!(bg.edges().pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn gray_search_space_is_converted_once() {
        let bg = BackgroundStrategy::default().normalize(&scene()).unwrap();
        assert_eq!(bg.gray(), &to_gray(bg.edges()));

        let built =
            NormalizedBackground::from_parts(bg.edges().clone(), bg.display().clone()).unwrap();
        assert_eq!(built.gray(), bg.gray());
    }

    #[test]
    fn resize_crop_uses_canonical_size_or_smaller() {
        let bg = BackgroundStrategy::resize_crop().normalize(&scene()).unwrap();
        let (w, h) = bg.edges().dimensions();
        assert!(w <= CANONICAL_WIDTH && h <= CANONICAL_HEIGHT);
        assert_eq!(bg.display().dimensions(), (w, h));
    }

    #[test]
    fn near_white_removal_crops_display_too() {
        let img = RgbImage::from_fn(60, 40, |x, y| {
            if (20..30).contains(&x) && (10..20).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let cfg = NormalizeConfig {
            removal: Removal::NearWhite(WhitespaceCrop {
                white_threshold: 30,
                padding: 2,
            }),
            ..NormalizeConfig::default()
        };
        let bg = cfg.normalize(&img).unwrap();
        assert_eq!(bg.display().dimensions(), (14, 14));
        assert_eq!(bg.edges().dimensions(), (14, 14));
    }

    #[test]
    fn zero_resize_is_rejected() {
        let cfg = NormalizeConfig {
            resize: Some([0, 10]),
            ..NormalizeConfig::default()
        };
        assert!(matches!(
            cfg.normalize(&scene()),
            Err(SolveError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn strategy_parses_from_json() {
        let s: BackgroundStrategy =
            serde_json::from_str(r#"{"kind":"resize_crop","width":150}"#).unwrap();
        let cfg = s.config();
        assert_eq!(cfg.resize, Some([150, CANONICAL_HEIGHT]));
        assert_eq!(cfg.edges, EdgeParams::sharp());
        assert!(cfg.recrop.is_some());
    }
}
