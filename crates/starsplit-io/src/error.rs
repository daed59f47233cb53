use starsplit_columnar::ColumnarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv input was empty")]
    EmptyInput,
    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },
    #[error("column {column} contains binary (non UTF-8) data")]
    BinaryColumn { column: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Columnar(#[from] ColumnarError),
}

pub(crate) fn map_csv_error(err: csv::Error, fallback_row: u64) -> CsvError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => CsvError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record() + 1)
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            CsvError::Parse {
                row,
                column: 0,
                reason,
            }
        }
    }
}
