//! Snapping raw offsets to empirically observed corrected values.
//!
//! The table is a JSON array of records exposing a numeric `puzzle_left`
//! (measured reference) and `slider_left` (corrected value). Other fields
//! are ignored, and records missing either number are skipped.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trace::{trace_event, trace_warn};
use crate::util::{SlideMatchResult, SolveError};

/// One observed (measured, corrected) pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    #[serde(rename = "puzzle_left")]
    pub measured_left: f64,
    #[serde(rename = "slider_left")]
    pub corrected_left: f64,
}

/// Outcome of [`CalibrationTable::correct`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Correction {
    /// `measured_left` of the selected pair.
    pub nearest_measured: f64,
    /// `corrected_left` of the selected pair.
    pub corrected: f64,
    /// True when no pair was at or above the measurement.
    pub fallback: bool,
}

/// Ordered collection of calibration pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationTable {
    pairs: Vec<CalibrationPair>,
}

impl CalibrationTable {
    /// Builds a table from pairs in the given order.
    pub fn from_pairs(pairs: Vec<CalibrationPair>) -> Self {
        Self { pairs }
    }

    /// Parses the JSON record array.
    pub fn from_json(text: &str) -> SlideMatchResult<Self> {
        let records: Vec<Value> =
            serde_json::from_str(text).map_err(|err| SolveError::NotFound {
                what: format!("calibration table: {err}"),
            })?;
        let pairs = records
            .iter()
            .filter_map(|record| {
                Some(CalibrationPair {
                    measured_left: record.get("puzzle_left")?.as_f64()?,
                    corrected_left: record.get("slider_left")?.as_f64()?,
                })
            })
            .collect();
        Ok(Self { pairs })
    }

    /// Reads and parses the table at `path`.
    ///
    /// A missing or malformed file is [`SolveError::NotFound`].
    pub fn load(path: &Path) -> SlideMatchResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| SolveError::NotFound {
            what: format!("calibration table {}: {err}", path.display()),
        })?;
        Self::from_json(&text)
    }

    /// Returns the usable pairs.
    pub fn pairs(&self) -> &[CalibrationPair] {
        &self.pairs
    }

    /// Number of usable pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when the table has no usable pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Picks the pair closest to `measured` from at or above it.
    ///
    /// Pairs below the measurement are never chosen unless every pair is;
    /// then the first pair with the largest `measured_left` wins. Ties keep
    /// the earlier pair. Returns `None` for an empty table.
    pub fn correct(&self, measured: f64) -> Option<Correction> {
        let mut nearest: Option<&CalibrationPair> = None;
        for pair in self.pairs.iter().filter(|p| p.measured_left >= measured) {
            let closer = nearest.map_or(true, |n| {
                pair.measured_left - measured < n.measured_left - measured
            });
            if closer {
                nearest = Some(pair);
            }
        }
        if let Some(pair) = nearest {
            return Some(Correction {
                nearest_measured: pair.measured_left,
                corrected: pair.corrected_left,
                fallback: false,
            });
        }

        let mut largest: Option<&CalibrationPair> = None;
        for pair in &self.pairs {
            if largest.map_or(true, |l| pair.measured_left > l.measured_left) {
                largest = Some(pair);
            }
        }
        let pair = largest?;
        trace_event!("calibration_fallback", measured = measured, nearest = pair.measured_left);
        Some(Correction {
            nearest_measured: pair.measured_left,
            corrected: pair.corrected_left,
            fallback: true,
        })
    }
}

/// Loads `path` and corrects `measured`, degrading any failure to `None`.
pub fn correct_from_file(path: &Path, measured: f64) -> Option<Correction> {
    match CalibrationTable::load(path) {
        Ok(table) => table.correct(measured),
        Err(err) => {
            trace_warn!("calibration_unavailable", stage = err.stage());
            None
        }
    }
}
