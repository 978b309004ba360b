//! Error types for the route-leak detection engine.

use thiserror::Error;

/// Result type for route-leak detection operations.
pub type Result<T> = std::result::Result<T, RouteLeakError>;

/// Error types surfaced by the detection, fitting, feature-extraction and
/// classification pipelines.
#[derive(Error, Debug)]
pub enum RouteLeakError {
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store line in {0}: {1}")]
    MalformedStoreLine(String, #[source] serde_json::Error),

    #[error("prefix and conflict stores have mismatched series lengths: {pfx} vs {cfl}")]
    LengthMismatch { pfx: usize, cfl: usize },

    #[error("start_date mismatch between stores: {pfx} vs {cfl}")]
    StartDateMismatch { pfx: String, cfl: String },

    #[error("invalid parameter name: {0}")]
    UnknownParameter(String),

    #[error("invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("model artefact could not be loaded from any of its three forms under {dir}")]
    ModelArtefactAbsent { dir: String },

    #[error("failed to (de)serialise model artefact: {0}")]
    Artefact(#[source] bincode::Error),

    #[error("failed to read CSV data: {0}")]
    Csv(#[source] csv::Error),

    #[error("SVM fitting failed: {0}")]
    ModelFit(String),

    #[error("internal error: {0}")]
    Internal(String),
}
