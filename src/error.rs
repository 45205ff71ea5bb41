//! Typed errors for loading and segmentation failures

use thiserror::Error;

/// Errors raised while turning a CSV file into an observation table
#[derive(Error, Debug, PartialEq)]
pub enum LoadError {
    /// The requested identifier column is not in the header
    #[error("Identifier column '{0}' not found in input")]
    MissingIdColumn(String),

    /// Only the identifier column (or nothing) was present
    #[error("No feature columns left after dropping identifier column")]
    NoFeatureColumns,

    /// The file has a header but no data rows
    #[error("Input contains no rows")]
    Empty,

    /// A feature cell was empty or could not be read as a number
    #[error("Column '{column}' has {count} missing or non-numeric value(s)")]
    NonNumeric { column: String, count: usize },

    /// Shape of supplied parts does not agree
    #[error("Shape mismatch: {0}")]
    Shape(String),
}

/// Errors raised by the K-Means segmenter
#[derive(Error, Debug, PartialEq)]
pub enum SegmentError {
    /// Number of clusters must be positive
    #[error("Invalid k value: {0}")]
    InvalidK(usize),

    /// Fewer observations than requested clusters
    #[error("Cannot form {k} clusters from {rows} observation(s)")]
    TooFewRows { rows: usize, k: usize },

    /// Iteration cap, tolerance or restart count out of range
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Feature vector length differs from the fitted model
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
