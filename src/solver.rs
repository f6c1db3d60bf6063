//! End-to-end orchestration of one solve request.
//!
//! `fetch gap ∥ fetch background → extract shape → cache shape → normalize
//! background → evaluate → calibrate`. The first failure in fetch, extract,
//! cache, normalize, or annotation-write aborts the request. An empty
//! evaluation or unavailable calibration yields null fields instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::background::{BackgroundNormalizer, BackgroundStrategy};
use crate::cache::{CacheEntryId, ShapeCache};
use crate::calibration::correct_from_file;
use crate::evaluate::Evaluator;
use crate::search::{MatchConfig, Matcher};
use crate::shape::{ShapeExtractor, ShapeStrategy};
#[cfg(feature = "http")]
use crate::source::AnySource;
use crate::source::{ImageSource, DEFAULT_FETCH_TIMEOUT};
use crate::trace::{trace_event, trace_span};
use crate::util::{SlideMatchResult, SolveError};

/// Solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Directory holding `image_gap_<n>.png` entries.
    pub cache_dir: PathBuf,
    /// Default location of the annotated winner image.
    pub output_path: PathBuf,
    /// Optional JSON calibration table.
    pub calibration_path: Option<PathBuf>,
    pub shape: ShapeStrategy,
    pub background: BackgroundStrategy,
    pub matcher: MatchConfig,
    /// Require the cache directory and calibration table to exist up front.
    pub strict: bool,
    /// Bound on each image download, in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("gap_image"),
            output_path: PathBuf::from("result/result.png"),
            calibration_path: None,
            shape: ShapeStrategy::default(),
            background: BackgroundStrategy::default(),
            matcher: MatchConfig::default(),
            strict: false,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SolverConfig {
    /// Download timeout as a [`Duration`].
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Structured outcome handed back to the caller.
///
/// Position fields are `None` when no cached shape could be matched; the
/// calibration fields are also `None` when the table is absent or unusable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolveResult {
    pub position: Option<f64>,
    pub confidence: Option<f64>,
    pub matched_entry_id: Option<String>,
    /// Locator of the gap image as supplied by the caller.
    pub source_gap: String,
    /// Cache identity the gap's shape resolved to.
    pub gap_entry_id: String,
    pub output_path: String,
    pub corrected_measured: Option<f64>,
    pub corrected_value: Option<f64>,
}

/// Request orchestrator over a shared [`ShapeCache`].
pub struct Solver<S> {
    source: S,
    cache: Arc<ShapeCache>,
    evaluator: Evaluator,
    config: SolverConfig,
}

impl<S: ImageSource> Solver<S> {
    /// Opens the cache named in `config` and builds a solver.
    ///
    /// In strict mode a missing cache directory or calibration table is a
    /// [`SolveError::Configuration`]; otherwise the directory is created.
    pub fn new(source: S, config: SolverConfig) -> SlideMatchResult<Self> {
        let cache = if config.strict {
            ShapeCache::open_existing(&config.cache_dir)?
        } else {
            ShapeCache::open(&config.cache_dir)?
        };
        Self::with_cache(source, Arc::new(cache), config)
    }

    /// Builds a solver over an already opened cache.
    pub fn with_cache(
        source: S,
        cache: Arc<ShapeCache>,
        config: SolverConfig,
    ) -> SlideMatchResult<Self> {
        if config.strict {
            match &config.calibration_path {
                Some(path) if path.is_file() => {}
                Some(path) => {
                    return Err(SolveError::Configuration {
                        reason: format!("calibration table {} does not exist", path.display()),
                    })
                }
                None => {
                    return Err(SolveError::Configuration {
                        reason: "strict mode requires a calibration table".to_owned(),
                    })
                }
            }
        }
        let evaluator = Evaluator::new(Matcher::new().with_config(config.matcher.clone()));
        Ok(Self {
            source,
            cache,
            evaluator,
            config,
        })
    }

    /// Source the solver fetches from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Shared shape cache.
    pub fn cache(&self) -> &Arc<ShapeCache> {
        &self.cache
    }

    /// Active configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves one request, writing the annotation to the configured path.
    pub fn solve(&self, gap: &str, background: &str) -> SlideMatchResult<SolveResult> {
        self.solve_to(gap, background, &self.config.output_path)
    }

    /// Solves one request, writing the annotation to `output`.
    pub fn solve_to(
        &self,
        gap: &str,
        background: &str,
        output: &Path,
    ) -> SlideMatchResult<SolveResult> {
        let _span = trace_span!("solve").entered();

        let (gap_img, bg_img) = std::thread::scope(|scope| {
            let bg = scope.spawn(|| self.source.fetch(background));
            let gap_img = self.source.fetch(gap);
            let bg_img = bg
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (gap_img, bg_img)
        });
        let gap_img = gap_img?;
        trace_event!("gap_fetched", width = gap_img.width(), height = gap_img.height());

        let shape = self.config.shape.extract(&gap_img)?;
        let gap_entry: CacheEntryId = self.cache.put(&shape)?;

        let bg_img = bg_img?;
        trace_event!("background_fetched", width = bg_img.width(), height = bg_img.height());
        let normalized = self.config.background.normalize(&bg_img)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| SolveError::io(parent, err))?;
        }
        let evaluation = self.evaluator.evaluate(&self.cache, &normalized, output)?;

        let mut result = SolveResult {
            position: None,
            confidence: None,
            matched_entry_id: None,
            source_gap: gap.to_owned(),
            gap_entry_id: gap_entry.to_string(),
            output_path: output.display().to_string(),
            corrected_measured: None,
            corrected_value: None,
        };
        let Some(evaluation) = evaluation else {
            return Ok(result);
        };
        result.position = Some(evaluation.result.offset_x);
        result.confidence = Some(evaluation.result.confidence);
        result.matched_entry_id = Some(evaluation.entry.to_string());

        if let Some(path) = &self.config.calibration_path {
            if let Some(correction) = correct_from_file(path, evaluation.result.offset_x) {
                result.corrected_measured = Some(correction.nearest_measured);
                result.corrected_value = Some(correction.corrected);
            }
        }
        Ok(result)
    }
}

#[cfg(feature = "http")]
impl Solver<AnySource> {
    /// Builds a solver over files and HTTP(S) URLs, with downloads bounded
    /// by [`SolverConfig::fetch_timeout_ms`].
    pub fn from_config(config: SolverConfig) -> SlideMatchResult<Self> {
        let source = AnySource::new(config.fetch_timeout());
        Self::new(source, config)
    }
}
