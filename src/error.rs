//! Error types for rusty-fair

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FairnessError {
    /// The dataset lacks a column the `DatasetSpec` refers to, or a value cannot be
    /// evaluated by the configured predicate.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A group or (protected, label) cell has zero weighted count.
    #[error("Degenerate group: {0}")]
    DegenerateGroup(String),

    #[error("Invalid weight {weight} at row {row}")]
    InvalidWeight { row: usize, weight: f64 },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T> = std::result::Result<T, FairnessError>;
