//! Slidematch locates the horizontal offset of a slider-puzzle piece.
//!
//! A gap image is reduced to a silhouette [`Shape`], deduplicated into an
//! on-disk [`ShapeCache`], and every cached shape is correlated (ZNCC) with
//! an edge-normalized background. The best placement can be snapped to a
//! [`CalibrationTable`]. [`Solver`] wires the stages together; each stage is
//! also usable on its own. Row-parallel scanning is available via the
//! `rayon` feature and HTTP fetching via the default `http` feature.

pub mod background;
pub mod cache;
pub mod calibration;
pub mod evaluate;
pub mod image;
pub mod kernel;
pub mod preprocess;
pub mod search;
pub mod shape;
pub mod solver;
pub mod source;
mod trace;
pub mod util;

pub use background::{BackgroundNormalizer, BackgroundStrategy, NormalizedBackground};
pub use cache::{CacheEntryId, ShapeCache};
pub use calibration::{CalibrationPair, CalibrationTable, Correction};
pub use evaluate::{Evaluation, Evaluator};
pub use image::ImageView;
pub use kernel::{Peak, ScanParams, TemplatePlan};
pub use preprocess::EdgeParams;
pub use search::{MatchConfig, MatchResult, Matcher, OffsetCorrection, Placement};
pub use shape::{Shape, ShapeExtractor, ShapeStrategy};
pub use solver::{SolveResult, Solver, SolverConfig};
pub use source::{FileSource, ImageSource, MemorySource};
#[cfg(feature = "http")]
pub use source::{AnySource, HttpSource};
pub use util::{SlideMatchResult, SolveError};
