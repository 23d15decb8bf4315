//! Data handling for the scatterplot-matrix engine
//!
//! Holds the columnar point table, the bucket index used for point queries
//! and the correlation statistics shown per plot.

pub mod index;
pub mod stats;
pub mod table;

use arrow::error::ArrowError;
use thiserror::Error;

// Re-exports
pub use index::{PixelProjection, ScanStats, SpatialIndex};
pub use stats::{correlation, CorrelationKind};
pub use table::{PointTable, SharedTable};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Filter has {found} entries, expected {expected}")]
    FilterLengthMismatch { expected: usize, found: usize },

    #[error("Column index {index} out of range ({count} columns)")]
    InvalidColumnIndex { index: usize, count: usize },

    #[error("Row index {index} out of range ({count} rows)")]
    InvalidRowIndex { index: usize, count: usize },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}
