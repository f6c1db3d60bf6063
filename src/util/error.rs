//! Error types for slidematch.

use thiserror::Error;

/// Result alias for slidematch operations.
pub type SlideMatchResult<T> = std::result::Result<T, SolveError>;

/// Errors that can occur while solving a slider puzzle.
///
/// Variants are grouped by pipeline stage; [`SolveError::stage`] exposes the
/// stage so callers can branch without parsing messages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// Downloading or reading an image source failed.
    #[error("failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },
    /// Image bytes were fetched but could not be decoded.
    #[error("failed to decode image from {locator}: {reason}")]
    Decode { locator: String, reason: String },
    /// No usable silhouette could be extracted from the gap image.
    #[error("shape extraction failed: {reason}")]
    Extraction { reason: &'static str },
    /// The template does not fit inside the search image.
    #[error(
        "template {template_width}x{template_height} exceeds search image {image_width}x{image_height}"
    )]
    Dimension {
        template_width: usize,
        template_height: usize,
        image_width: usize,
        image_height: usize,
    },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the image width.
    #[error("invalid stride: width={width}, stride={stride}")]
    InvalidStride { width: usize, stride: usize },
    /// Buffer does not hold enough elements for the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The template has no intensity variation to correlate against.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Every candidate window was flat, so no placement could be scored.
    #[error("no placement with non-zero variance")]
    NoPlacement,
    /// A cache entry or calibration table is missing or unreadable.
    #[error("not found: {what}")]
    NotFound { what: String },
    /// A required resource is missing in strict mode.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
    /// Filesystem failure while persisting cache entries or outputs.
    #[error("i/o error at {path}: {reason}")]
    Io { path: String, reason: String },
}

impl SolveError {
    /// Returns the pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch { .. } | Self::Decode { .. } => "fetch",
            Self::Extraction { .. } => "extract",
            Self::Dimension { .. }
            | Self::InvalidDimensions { .. }
            | Self::InvalidStride { .. }
            | Self::BufferTooSmall { .. }
            | Self::DegenerateTemplate { .. }
            | Self::NoPlacement => "match",
            Self::NotFound { .. } => "lookup",
            Self::Configuration { .. } => "configuration",
            Self::Io { .. } => "io",
        }
    }

    /// Returns true when the error must abort the whole solve.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Dimension { .. }
                | Self::DegenerateTemplate { .. }
                | Self::NoPlacement
                | Self::NotFound { .. }
        )
    }

    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
