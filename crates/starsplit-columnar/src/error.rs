use crate::types::ColumnType;

pub type ColumnarResult<T> = Result<T, ColumnarError>;

#[derive(Debug, thiserror::Error)]
pub enum ColumnarError {
    #[error("column index {index} out of range for table with {column_count} columns")]
    ColumnOutOfRange { index: usize, column_count: usize },

    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("row has {actual} values, expected {expected}")]
    RowWidth { expected: usize, actual: usize },

    #[error("type mismatch in column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("column {column} has more distinct strings than a dictionary can index")]
    DictionaryOverflow { column: String },

    #[cfg(feature = "arrow")]
    #[error("unsupported arrow type {data_type} in column {column}")]
    UnsupportedArrowType { column: String, data_type: String },

    #[cfg(feature = "arrow")]
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    #[cfg(feature = "arrow")]
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}
