//! Gap-piece silhouettes and the strategies that extract them.
//!
//! A [`Shape`] is always cropped to its tight bounding box and holds at least
//! one foreground pixel. Extraction strategies are interchangeable; the
//! caller picks one through [`ShapeStrategy`].

mod outline;
mod whitespace;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::preprocess::EdgeParams;
use crate::trace::{trace_event, trace_span};
use crate::util::{SlideMatchResult, SolveError};

/// Extracted silhouette (outline ring or edge map) of a gap piece.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    img: RgbImage,
}

impl Shape {
    /// Wraps an image, rejecting empty or all-black buffers.
    pub fn new(img: RgbImage) -> SlideMatchResult<Self> {
        if img.width() == 0 || img.height() == 0 {
            return Err(SolveError::Extraction {
                reason: "shape has zero size",
            });
        }
        if img.as_raw().iter().all(|&v| v == 0) {
            return Err(SolveError::Extraction {
                reason: "shape has no foreground pixels",
            });
        }
        Ok(Self { img })
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> u32 {
        self.img.width()
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> u32 {
        self.img.height()
    }

    /// Returns the 3-channel pixels.
    pub fn image(&self) -> &RgbImage {
        &self.img
    }

    /// Consumes the shape and returns its pixels.
    pub fn into_image(self) -> RgbImage {
        self.img
    }

    /// Single-channel intensity used as the correlation template.
    pub fn gray(&self) -> GrayImage {
        crate::preprocess::to_gray(&self.img)
    }

    /// Pixel-exact comparison: same dimensions and zero total difference.
    pub fn pixels_equal(&self, other: &Shape) -> bool {
        self.img.dimensions() == other.img.dimensions() && self.img.as_raw() == other.img.as_raw()
    }
}

/// Converts a raw gap image into a [`Shape`].
pub trait ShapeExtractor {
    /// Extracts the silhouette; fails with [`SolveError::Extraction`].
    fn extract(&self, gap: &RgbImage) -> SlideMatchResult<Shape>;
}

/// Selects how the gap piece is turned into a matching template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeStrategy {
    /// Otsu mask, filled external contour, thin ring left by erosion.
    ///
    /// Suited to pieces on a background cleanly separable by intensity.
    Outline {
        /// Number of 3x3 erosions subtracted from the filled mask.
        #[serde(default = "default_erode_iterations")]
        erode_iterations: u8,
    },
    /// Crop near-white margins, then take the edge map of what remains.
    WhitespaceEdges {
        /// HSV distance from white still treated as background.
        #[serde(default = "default_white_threshold")]
        white_threshold: u8,
        /// Pixels kept around the content box.
        #[serde(default = "default_padding")]
        padding: u32,
        #[serde(default = "EdgeParams::sharp")]
        edges: EdgeParams,
    },
}

pub(crate) fn default_erode_iterations() -> u8 {
    2
}

pub(crate) fn default_white_threshold() -> u8 {
    30
}

pub(crate) fn default_padding() -> u32 {
    5
}

impl Default for ShapeStrategy {
    fn default() -> Self {
        Self::Outline {
            erode_iterations: default_erode_iterations(),
        }
    }
}

impl ShapeStrategy {
    /// Whitespace strategy with the usual provider constants.
    pub fn whitespace_edges() -> Self {
        Self::WhitespaceEdges {
            white_threshold: default_white_threshold(),
            padding: default_padding(),
            edges: EdgeParams::sharp(),
        }
    }
}

impl ShapeExtractor for ShapeStrategy {
    fn extract(&self, gap: &RgbImage) -> SlideMatchResult<Shape> {
        let _span =
            trace_span!("extract_shape", width = gap.width(), height = gap.height()).entered();
        let shape = match self {
            Self::Outline { erode_iterations } => outline::extract(gap, *erode_iterations)?,
            Self::WhitespaceEdges {
                white_threshold,
                padding,
                edges,
            } => whitespace::extract(gap, *white_threshold, *padding, edges)?,
        };
        trace_event!(
            "shape_extracted",
            width = shape.width(),
            height = shape.height()
        );
        Ok(shape)
    }
}
