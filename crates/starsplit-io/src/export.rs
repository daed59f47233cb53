use std::io::Write;

use chrono::DateTime;
use csv::ByteRecord;
use starsplit_columnar::{ColumnarTable, Value};

use crate::error::{map_csv_error, CsvError};

/// Write `table` as comma-separated text with a header row.
///
/// Nulls become empty fields; timestamps print as `YYYY-MM-DD HH:MM:SS[.fff]` (UTC), which
/// [`import_csv`](crate::import_csv) reads back to the same value.
pub fn export_csv<W: Write>(writer: W, table: &ColumnarTable) -> Result<(), CsvError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.schema().iter().map(|c| c.name.as_bytes()))
        .map_err(|e| map_csv_error(e, 1))?;

    let mut record = ByteRecord::new();
    for row in 0..table.row_count() {
        record.clear();
        for column in table.columns() {
            match column.value(row) {
                Value::Null => record.push_field(b""),
                Value::String(s) => record.push_field(s.as_bytes()),
                Value::Binary(b) => record.push_field(&b),
                Value::Timestamp(ms) => record.push_field(format_timestamp(ms).as_bytes()),
                other => record.push_field(other.to_string().as_bytes()),
            }
        }
        out.write_byte_record(&record)
            .map_err(|e| map_csv_error(e, row as u64 + 2))?;
    }
    out.flush()?;
    Ok(())
}

fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) if dt.timestamp_subsec_millis() == 0 => {
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        }
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => ms.to_string(),
    }
}
