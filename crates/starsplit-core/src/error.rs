use starsplit_columnar::{ColumnType, ColumnarError};

pub type SplitResult<T> = Result<T, SplitError>;

/// Failures of a decomposition. Every variant aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported column type {column_type} in column {column}")]
    UnsupportedColumnType {
        column: String,
        column_type: ColumnType,
    },

    #[error("inconsistent grouping: {0}")]
    InconsistentGrouping(String),

    #[error(transparent)]
    Engine(#[from] ColumnarError),
}
