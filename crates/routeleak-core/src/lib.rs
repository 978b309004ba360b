//! Core BGP full-view route-leak detection engine.
//!
//! This crate implements the heuristic peak detector, parameter fitter,
//! feature extractor and SVM classifier used to flag synchronized spikes
//! in per-AS prefix-announcement and conflict-count series.

pub mod coalesce;
pub mod detector;
pub mod error;
pub mod features;
pub mod fitter;
pub mod io;
pub mod metrics;
pub mod model;
pub mod peaks;
pub mod smoother;
pub mod types;

// Re-exports for convenience
pub use coalesce::{coalesce, put_duplicates_back, Coalesced};
pub use detector::{detect_route_leaks, MIN_NB_DAYS};
pub use error::{Result, RouteLeakError};
pub use features::{extract_features, FEATURE_LEN};
pub use fitter::{fit_params, get_best_param_value, PARAM_NAMES};
pub use io::{load_feature_json, load_labels_csv, load_store};
pub use metrics::r2;
pub use model::{classify, load_classifier, save_classifier, ClassificationResults, ClassifiedSeries};
pub use peaks::{find_big_maxes, find_big_maxes_with_params, rejection_cause};
pub use smoother::{speculate_missing_values, CLASSIFICATION_SMOOTHING_PEAK_MIN_VALUE, MAX_NB_ZERO_TO_RM};
pub use types::{LeakDay, LeakRecord, Params, PeakSet, RejectionCause, Series, Store};
