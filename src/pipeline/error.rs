//! Data and format errors raised by the loading and feature pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while locating, parsing, or transforming customer data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw-data directory holds no entries at all.
    #[error("No files in directory {0}. Check your path or files")]
    EmptyDirectory(PathBuf),

    /// No candidate delimiter produced a consistent tabular structure
    /// over the sampled file prefix.
    #[error("could not detect a field delimiter from the first {sample_len} bytes of {path}")]
    UndetectableDelimiter { path: PathBuf, sample_len: usize },

    /// A column the pipeline depends on is absent from the input batch.
    #[error("required column '{0}' is missing from the input data")]
    MissingColumn(String),

    /// A Gender value outside the explicit Male/Female mapping.
    /// Unknown categories are rejected rather than silently passed through.
    #[error("unmappable Gender value {0:?}; expected \"Male\" or \"Female\"")]
    UnmappedGender(String),

    /// The input batch has fewer columns than the identifier prefix.
    #[error("expected at least {expected} leading identifier columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },
}
