//! Loading and storing tables for the star-schema tools.

mod error;
mod export;
mod import;
mod layout;

pub use error::CsvError;
pub use export::export_csv;
pub use import::{import_csv, import_csv_path, CsvOptions};
pub use layout::{
    dim_path, fact_path, normalized_path, read_star_schema, read_table, write_normalized,
    write_star_schema, write_table, OutputFormat, SizeReport,
};
