//! Ranking every cached shape against one background.

use std::path::Path;

use serde::Serialize;

use crate::background::NormalizedBackground;
use crate::cache::{CacheEntryId, ShapeCache};
use crate::search::{MatchResult, Matcher};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::SlideMatchResult;

/// Winning cache entry and its match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Evaluation {
    pub entry: CacheEntryId,
    pub result: MatchResult,
    /// Entries that could not be loaded or matched.
    pub skipped: usize,
}

/// Runs the [`Matcher`] over a whole [`ShapeCache`].
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    matcher: Matcher,
}

impl Evaluator {
    /// Creates an evaluator around `matcher`.
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    /// Returns the wrapped matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Ranks every entry in `cache` by confidence and annotates the winner.
    ///
    /// Entries are visited in [`ShapeCache::list`] order; a later entry must
    /// score strictly higher to replace the current best. Entries that fail
    /// to load or match are skipped. Returns `Ok(None)` when nothing could
    /// be scored. The annotated copy of `background.display()` is written to
    /// `output` for the winner only; a failed write is returned as an error.
    pub fn evaluate(
        &self,
        cache: &ShapeCache,
        background: &NormalizedBackground,
        output: &Path,
    ) -> SlideMatchResult<Option<Evaluation>> {
        let ids = cache.list();
        let _span = trace_span!("evaluate", entries = ids.len()).entered();

        let mut best: Option<(CacheEntryId, MatchResult)> = None;
        let mut skipped = 0usize;
        for id in ids {
            let outcome = cache
                .load(id)
                .and_then(|shape| self.matcher.locate(&shape, background));
            match outcome {
                Ok(result) => {
                    let better = best
                        .as_ref()
                        .map_or(true, |(_, b)| result.confidence > b.confidence);
                    if better {
                        best = Some((id, result));
                    }
                }
                Err(err) => {
                    skipped += 1;
                    trace_warn!("entry_skipped", entry = id.index(), stage = err.stage());
                }
            }
        }

        let Some((entry, _)) = best else {
            trace_event!("no_match", skipped = skipped);
            return Ok(None);
        };

        let shape = cache.load(entry)?;
        let result =
            self.matcher
                .locate_annotated(&shape, background, background.display(), output)?;
        trace_event!(
            "winner",
            entry = entry.index(),
            confidence = result.confidence,
            skipped = skipped
        );
        Ok(Some(Evaluation {
            entry,
            result,
            skipped,
        }))
    }
}
