//! Core data model: input series, detection parameters, and result records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One AS's daily observation series, keyed by integer ASN.
pub type Series = BTreeMap<String, Vec<f64>>;

/// A processed input store: one series per AS plus, if known, the calendar
/// date the first element of every series corresponds to.
///
/// `start_date` is `None` when the input carried no leading
/// `{"start_date": ...}` line; leak indexes are then reported as raw day
/// offsets instead of calendar dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub start_date: Option<NaiveDate>,
    pub series: Series,
}

impl Store {
    /// Length of the series, taken from the first entry (stores are only
    /// ever built with equal-length series per [`crate::io`]).
    pub fn series_len(&self) -> usize {
        self.series.values().next().map_or(0, Vec::len)
    }
}

/// Detection parameters, see spec §4.B/§4.E.
///
/// Defaults match `_BaseFindRouteLeaks.__init__`'s signature in the
/// reference heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub pfx_peak_min_value: f64,
    pub cfl_peak_min_value: f64,
    pub max_nb_peaks: usize,
    pub percent_similarity: f64,
    pub percent_std: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            pfx_peak_min_value: 10.0,
            cfl_peak_min_value: 5.0,
            max_nb_peaks: 2,
            percent_similarity: 0.9,
            percent_std: 0.9,
        }
    }
}

impl Params {
    /// Look up a parameter by its on-the-wire/CLI name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "pfx_peak_min_value" => Some(self.pfx_peak_min_value),
            "cfl_peak_min_value" => Some(self.cfl_peak_min_value),
            "max_nb_peaks" => Some(self.max_nb_peaks as f64),
            "percent_similarity" => Some(self.percent_similarity),
            "percent_std" => Some(self.percent_std),
            _ => None,
        }
    }

    /// Set a parameter by its on-the-wire/CLI name.
    pub fn set(&mut self, name: &str, value: f64) -> crate::error::Result<()> {
        match name {
            "pfx_peak_min_value" => self.pfx_peak_min_value = value,
            "cfl_peak_min_value" => self.cfl_peak_min_value = value,
            "max_nb_peaks" => self.max_nb_peaks = value as usize,
            "percent_similarity" => self.percent_similarity = value,
            "percent_std" => self.percent_std = value,
            other => return Err(crate::error::RouteLeakError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }
}

/// Why a candidate local maximum at a given index was rejected, or that it
/// was accepted. Mirrors `FindPeaks.get_rejection_cause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionCause {
    Accepted,
    NotLocalMax,
    TooSmall,
    NotCloseToAbsMax,
    TooManyPeaks,
    StdVariationTooLow,
}

/// A set of accepted peak indexes for one AS/series, with the per-index
/// diagnostic trail retained for inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeakSet {
    pub indexes: Vec<usize>,
    pub causes: BTreeMap<usize, RejectionCause>,
}

/// A single leak occurrence, reported as a calendar date when the store's
/// `start_date` is known, or as a raw day index (0-based, into the series)
/// otherwise. Mirrors `_map_leaks_indexes` (identity) vs.
/// `_map_leaks_indexes_to_dates` in the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeakDay {
    Index(usize),
    Date(NaiveDate),
}

impl std::fmt::Display for LeakDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeakDay::Index(i) => write!(f, "{i}"),
            LeakDay::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Leak detection result for a single AS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakRecord {
    pub leaks: Vec<LeakDay>,
    pub prefixes: Vec<f64>,
    pub conflicts: Vec<f64>,
}
