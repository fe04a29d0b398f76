//! Errors raised while turning a merged sensor table into windowed features.

use thiserror::Error;

/// Errors that can occur during feature extraction.
///
/// Every variant is fatal for the run: extraction is a pure in-memory
/// computation, so there is nothing to retry and no partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A mandatory column (timestamp, device id, activity label or a
    /// magnitude channel) is absent from the input table.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A window parameter is out of range.
    #[error("invalid parameter {name} = {value}: must be a positive row count")]
    InvalidParameter { name: &'static str, value: usize },

    /// A column exists but holds the wrong kind of data.
    #[error("column '{column}' must be {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// A column added to a table has a different row count than the table.
    #[error("column '{column}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}
