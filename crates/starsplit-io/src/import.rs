use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use csv::ByteRecord;
use starsplit_columnar::{ColumnSchema, ColumnType, ColumnarTable, ColumnarTableBuilder, Value};

use crate::error::{map_csv_error, CsvError};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Number of data rows inspected to choose each column's type.
    pub sample_rows: usize,
    /// When false every text column is loaded as `String`.
    pub infer_types: bool,
    /// Fail on columns holding non UTF-8 bytes instead of loading them as `Binary`.
    pub reject_binary: bool,
    /// Field values read as null in addition to the empty field.
    pub null_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            sample_rows: 100,
            infer_types: true,
            reject_binary: true,
            null_values: Vec::new(),
        }
    }
}

impl CsvOptions {
    fn is_null(&self, field: &str) -> bool {
        field.is_empty() || self.null_values.iter().any(|n| n == field)
    }
}

/// Load a CSV stream into a [`ColumnarTable`].
///
/// Column types are picked from the first `sample_rows` data rows (integer, then float,
/// then timestamp, then string). A column whose later rows contradict the sampled type is
/// widened to the next candidate that fits every row, so loading never drops values.
/// Empty fields load as null. Rows shorter than the widest row are padded with nulls.
pub fn import_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<ColumnarTable, CsvError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Headers are handled here so row numbers in errors count every line.
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records: Vec<ByteRecord> = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => records.push(record.clone()),
            Err(e) => return Err(map_csv_error(e, records.len() as u64 + 1)),
        }
    }
    let Some(first) = records.first_mut() else {
        return Err(CsvError::EmptyInput);
    };
    strip_bom(first);

    let (header, data) = if options.has_header {
        let mut iter = records.into_iter();
        (iter.next(), iter.collect::<Vec<_>>())
    } else {
        (None, records)
    };
    // 1-based line of the first data record.
    let first_data_row = if header.is_some() { 2 } else { 1 };

    // An empty line still holds one empty field.
    let column_count = header
        .iter()
        .chain(data.iter())
        .map(ByteRecord::len)
        .max()
        .unwrap_or(0)
        .max(1);
    let ragged = data.iter().filter(|r| r.len() != column_count).count();
    if ragged > 0 {
        log::warn!("{ragged} row(s) have fewer than {column_count} fields; padding with nulls");
    }

    let mut names = Vec::with_capacity(column_count);
    if let Some(header) = &header {
        for (idx, field) in header.iter().enumerate() {
            names.push(decode_utf8(field, 1, idx as u64 + 1)?.into_owned());
        }
    }
    names.extend((names.len()..column_count).map(|i| format!("Column{}", i + 1)));

    let mut column_types = Vec::with_capacity(column_count);
    for (col, name) in names.iter().enumerate() {
        let column_type = infer_column_type(&data, col, name, options);
        if column_type == ColumnType::Binary && options.reject_binary {
            return Err(CsvError::BinaryColumn {
                column: name.clone(),
            });
        }
        column_types.push(column_type);
    }
    log::debug!("inferred column types {column_types:?}");

    let schema: Vec<ColumnSchema> = names
        .into_iter()
        .zip(column_types.iter().copied())
        .map(|(name, column_type)| ColumnSchema::new(name, column_type))
        .collect();
    let mut builder = ColumnarTableBuilder::new(schema);
    let mut row_values = vec![Value::Null; column_count];

    for (idx, record) in data.iter().enumerate() {
        let row = idx as u64 + first_data_row;
        for (col, column_type) in column_types.iter().copied().enumerate() {
            let raw = record.get(col).unwrap_or(b"");
            row_values[col] =
                parse_typed_value(raw, column_type, options).ok_or_else(|| CsvError::Parse {
                    row,
                    column: col as u64 + 1,
                    reason: format!("value does not parse as {column_type}"),
                })?;
        }
        builder.append_row(&row_values)?;
    }

    Ok(builder.finalize())
}

pub fn import_csv_path(path: &Path, options: &CsvOptions) -> Result<ColumnarTable, CsvError> {
    let file = File::open(path)?;
    import_csv(BufReader::new(file), options)
}

fn strip_bom(record: &mut ByteRecord) {
    let Some(first) = record.get(0) else {
        return;
    };
    let Some(stripped) = first.strip_prefix(UTF8_BOM) else {
        return;
    };
    let mut fixed = ByteRecord::new();
    fixed.push_field(stripped);
    for field in record.iter().skip(1) {
        fixed.push_field(field);
    }
    *record = fixed;
}

fn decode_utf8(field: &[u8], row: u64, column: u64) -> Result<Cow<'_, str>, CsvError> {
    std::str::from_utf8(field)
        .map(Cow::Borrowed)
        .map_err(|e| CsvError::Parse {
            row,
            column,
            reason: format!("invalid UTF-8: {e}"),
        })
}

fn infer_column_type(
    data: &[ByteRecord],
    col: usize,
    name: &str,
    options: &CsvOptions,
) -> ColumnType {
    if data
        .iter()
        .any(|r| std::str::from_utf8(r.get(col).unwrap_or(b"")).is_err())
    {
        return ColumnType::Binary;
    }
    if !options.infer_types {
        return ColumnType::String;
    }

    let text = |record: &ByteRecord| -> Option<String> {
        std::str::from_utf8(record.get(col).unwrap_or(b""))
            .ok()
            .filter(|v| !options.is_null(v))
            .map(str::to_owned)
    };
    let sample: Vec<String> = data
        .iter()
        .take(options.sample_rows)
        .filter_map(text)
        .collect();
    if sample.is_empty() {
        return ColumnType::String;
    }

    for candidate in [ColumnType::Integer, ColumnType::Float, ColumnType::Timestamp] {
        if !sample_fits(&sample, candidate) {
            continue;
        }
        let rest_fits = data
            .iter()
            .skip(options.sample_rows)
            .filter_map(text)
            .all(|v| parses_as(&v, candidate));
        if rest_fits {
            return candidate;
        }
        log::warn!(
            "column {name} looks like {candidate} in the first {} rows but not beyond; widening",
            options.sample_rows
        );
    }
    ColumnType::String
}

fn sample_fits(sample: &[String], column_type: ColumnType) -> bool {
    let all = sample.iter().all(|v| parses_as(v, column_type));
    match column_type {
        // `NaN` and `inf` alone do not make a float column.
        ColumnType::Float => all && sample.iter().any(|v| v.bytes().any(|b| b.is_ascii_digit())),
        _ => all,
    }
}

fn parses_as(field: &str, column_type: ColumnType) -> bool {
    match column_type {
        ColumnType::Integer => parse_integer(field).is_some(),
        ColumnType::Float => parse_float(field).is_some(),
        ColumnType::Timestamp => parse_timestamp_millis(field).is_some(),
        ColumnType::String => true,
        ColumnType::Binary => false,
    }
}

fn parse_typed_value(raw: &[u8], column_type: ColumnType, options: &CsvOptions) -> Option<Value> {
    if column_type == ColumnType::Binary {
        return Some(if raw.is_empty() {
            Value::Null
        } else {
            Value::Binary(Arc::from(raw))
        });
    }

    let v = std::str::from_utf8(raw).ok()?;
    if options.is_null(v) {
        return Some(Value::Null);
    }
    match column_type {
        ColumnType::Integer => parse_integer(v).map(Value::Integer),
        ColumnType::Float => parse_float(v).map(Value::Float),
        ColumnType::Timestamp => parse_timestamp_millis(v).map(Value::Timestamp),
        ColumnType::String | ColumnType::Binary => Some(Value::from(v)),
    }
}

fn parse_integer(v: &str) -> Option<i64> {
    v.parse().ok()
}

fn parse_float(v: &str) -> Option<f64> {
    v.parse().ok()
}

/// Milliseconds since the Unix epoch for `YYYY-MM-DD[( |T)HH:MM:SS[.fff]]`, read as UTC.
///
/// Sub-millisecond fractions are rejected so the stored value prints back unchanged.
pub(crate) fn parse_timestamp_millis(v: &str) -> Option<i64> {
    let datetime = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    let utc = datetime.and_utc();
    if utc.timestamp_subsec_nanos() % 1_000_000 != 0 {
        return None;
    }
    Some(utc.timestamp_millis())
}
