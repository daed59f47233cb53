#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::error::{ColumnarError, ColumnarResult};
use crate::stats::{fnv1a, splitmix64, table_stats, TableStats};
use crate::types::{float_key_bits, ColumnType, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Clone, Debug)]
enum ColumnData {
    /// Integer and timestamp columns.
    Int(Vec<i64>),
    Float(Vec<f64>),
    /// Dictionary encoded strings. Dictionary entries are unique, so two rows hold the
    /// same string exactly when they hold the same index.
    Dict {
        indices: Vec<u32>,
        dictionary: Arc<Vec<Arc<str>>>,
    },
    Bytes(Vec<Arc<[u8]>>),
}

/// One named, typed column. Null slots keep a placeholder in the data vector and are
/// marked in `validity` (absent when every row is valid).
#[derive(Clone, Debug)]
pub struct Column {
    schema: ColumnSchema,
    data: ColumnData,
    validity: Option<BitVec>,
}

impl Column {
    /// Build a column from values that must match `schema.column_type` (integers are
    /// accepted for float columns).
    pub fn from_values<I>(schema: ColumnSchema, values: I) -> ColumnarResult<Column>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut builder = ColumnBuilder::new(schema);
        for value in values {
            builder.push(&value)?;
        }
        Ok(builder.finish())
    }

    /// A non-null integer column.
    pub fn integers(name: impl Into<String>, values: Vec<i64>) -> Column {
        Column {
            schema: ColumnSchema::new(name, ColumnType::Integer),
            data: ColumnData::Int(values),
            validity: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.schema.column_type
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Dict { indices, .. } => indices.len(),
            ColumnData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, row: usize) -> bool {
        row < self.len() && self.validity.as_ref().map_or(true, |v| v.get(row))
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |v| v.len() - v.count_ones())
    }

    pub fn value(&self, row: usize) -> Value {
        if !self.is_valid(row) {
            return Value::Null;
        }
        match &self.data {
            ColumnData::Int(v) => match self.schema.column_type {
                ColumnType::Timestamp => Value::Timestamp(v[row]),
                _ => Value::Integer(v[row]),
            },
            ColumnData::Float(v) => Value::Float(v[row]),
            ColumnData::Dict {
                indices,
                dictionary,
            } => Value::String(dictionary[indices[row] as usize].clone()),
            ColumnData::Bytes(v) => Value::Binary(v[row].clone()),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).map(|row| self.value(row)).collect()
    }

    /// Integer payload of a valid row of an integer or timestamp column.
    pub fn i64_at(&self, row: usize) -> Option<i64> {
        if !self.is_valid(row) {
            return None;
        }
        match &self.data {
            ColumnData::Int(v) => Some(v[row]),
            _ => None,
        }
    }

    /// Same column under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Column {
        self.schema.name = name.into();
        self
    }

    /// Copy the given rows, in order. String columns share the source dictionary.
    pub fn gather(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Int(v) => ColumnData::Int(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Dict {
                indices,
                dictionary,
            } => ColumnData::Dict {
                indices: rows.iter().map(|&r| indices[r]).collect(),
                dictionary: dictionary.clone(),
            },
            ColumnData::Bytes(v) => ColumnData::Bytes(rows.iter().map(|&r| v[r].clone()).collect()),
        };
        let validity = self
            .validity
            .as_ref()
            .map(|v| v.gather(rows))
            .filter(|v| !v.all_true());
        Column {
            schema: self.schema.clone(),
            data,
            validity,
        }
    }

    /// Hash of a valid row's value, stable across runs. `None` for nulls.
    pub(crate) fn stable_hash(&self, row: usize) -> Option<u64> {
        if !self.is_valid(row) {
            return None;
        }
        let hash = match &self.data {
            ColumnData::Int(v) => splitmix64(v[row] as u64),
            ColumnData::Float(v) => splitmix64(float_key_bits(v[row])),
            ColumnData::Dict {
                indices,
                dictionary,
            } => splitmix64(fnv1a(dictionary[indices[row] as usize].as_bytes())),
            ColumnData::Bytes(v) => splitmix64(fnv1a(&v[row])),
        };
        Some(hash)
    }

    pub(crate) fn value_size(&self, row: usize) -> u64 {
        if !self.is_valid(row) {
            return 0;
        }
        match &self.data {
            ColumnData::Int(_) | ColumnData::Float(_) => 8,
            ColumnData::Dict {
                indices,
                dictionary,
            } => dictionary[indices[row] as usize].len() as u64,
            ColumnData::Bytes(v) => v[row].len() as u64,
        }
    }

    /// Dense per-row codes such that two rows share a code exactly when they hold equal
    /// values. Null rows get code 0.
    pub(crate) fn key_codes(&self) -> Vec<usize> {
        let len = self.len();
        let mut out = Vec::with_capacity(len);
        match &self.data {
            ColumnData::Dict { indices, .. } => {
                for (row, idx) in indices.iter().enumerate() {
                    out.push(if self.is_valid(row) { *idx as usize + 1 } else { 0 });
                }
            }
            ColumnData::Int(v) => intern_codes(self, v.iter().copied(), &mut out),
            ColumnData::Float(v) => intern_codes(self, v.iter().map(|f| float_key_bits(*f)), &mut out),
            ColumnData::Bytes(v) => intern_codes(self, v.iter().map(|b| &b[..]), &mut out),
        }
        out
    }
}

fn intern_codes<K, I>(column: &Column, keys: I, out: &mut Vec<usize>)
where
    K: std::hash::Hash + Eq,
    I: Iterator<Item = K>,
{
    let mut codes: HashMap<K, usize> = HashMap::new();
    for (row, key) in keys.enumerate() {
        if !column.is_valid(row) {
            out.push(0);
            continue;
        }
        let next = codes.len() + 1;
        out.push(*codes.entry(key).or_insert(next));
    }
}

/// An ordered collection of equally long columns.
#[derive(Clone, Debug, Default)]
pub struct ColumnarTable {
    schema: Vec<ColumnSchema>,
    columns: Vec<Column>,
    rows: usize,
}

impl ColumnarTable {
    pub fn new(columns: Vec<Column>) -> ColumnarResult<Self> {
        let rows = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(ColumnarError::LengthMismatch {
                column: bad.name().to_owned(),
                expected: rows,
                actual: bad.len(),
            });
        }
        Ok(Self {
            schema: columns.iter().map(|c| c.schema.clone()).collect(),
            columns,
            rows,
        })
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, idx: usize) -> ColumnarResult<&Column> {
        self.columns
            .get(idx)
            .ok_or(ColumnarError::ColumnOutOfRange {
                index: idx,
                column_count: self.columns.len(),
            })
    }

    /// Index of the first column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Value {
        match self.columns.get(col) {
            Some(column) if row < self.rows => column.value(row),
            _ => Value::Null,
        }
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    /// Column-major copy of every cell: `out[c][r]`.
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.columns.iter().map(Column::values).collect()
    }

    /// Append a column; its length must match the table.
    pub fn with_column(mut self, column: Column) -> ColumnarResult<Self> {
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(ColumnarError::LengthMismatch {
                column: column.name().to_owned(),
                expected: self.rows,
                actual: column.len(),
            });
        }
        self.rows = column.len();
        self.schema.push(column.schema.clone());
        self.columns.push(column);
        Ok(self)
    }

    /// Select and reorder columns.
    pub fn project(&self, cols: &[usize]) -> ColumnarResult<Self> {
        let mut columns = Vec::with_capacity(cols.len());
        for &idx in cols {
            columns.push(self.column(idx)?.clone());
        }
        Ok(Self {
            schema: columns.iter().map(|c| c.schema.clone()).collect(),
            columns,
            rows: self.rows,
        })
    }

    /// Replace every column name, keeping data and order.
    pub fn rename(self, names: Vec<String>) -> ColumnarResult<Self> {
        if names.len() != self.columns.len() {
            return Err(ColumnarError::RowWidth {
                expected: self.columns.len(),
                actual: names.len(),
            });
        }
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .zip(names)
            .map(|(column, name)| column.renamed(name))
            .collect();
        Ok(Self {
            schema: columns.iter().map(|c| c.schema.clone()).collect(),
            columns,
            rows: self.rows,
        })
    }

    /// Copy the given rows (in order) from every column.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            columns: self.columns.iter().map(|c| c.gather(rows)).collect(),
            rows: rows.len(),
        }
    }

    /// Per-column distinct-count estimates and byte sizes.
    pub fn stats(&self) -> TableStats {
        table_stats(self)
    }
}

/// Row-at-a-time table construction.
pub struct ColumnarTableBuilder {
    builders: Vec<ColumnBuilder>,
    rows: usize,
}

impl ColumnarTableBuilder {
    pub fn new(schema: Vec<ColumnSchema>) -> Self {
        Self {
            builders: schema.into_iter().map(ColumnBuilder::new).collect(),
            rows: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn append_row(&mut self, row: &[Value]) -> ColumnarResult<()> {
        if row.len() != self.builders.len() {
            return Err(ColumnarError::RowWidth {
                expected: self.builders.len(),
                actual: row.len(),
            });
        }
        for (builder, value) in self.builders.iter_mut().zip(row) {
            builder.push(value)?;
        }
        self.rows += 1;
        Ok(())
    }

    pub fn finalize(self) -> ColumnarTable {
        let columns: Vec<Column> = self.builders.into_iter().map(ColumnBuilder::finish).collect();
        ColumnarTable {
            schema: columns.iter().map(|c| c.schema.clone()).collect(),
            columns,
            rows: self.rows,
        }
    }
}

enum BuilderData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Dict {
        indices: Vec<u32>,
        dictionary: Vec<Arc<str>>,
        dict_map: HashMap<Arc<str>, u32>,
    },
    Bytes(Vec<Arc<[u8]>>),
}

pub(crate) struct ColumnBuilder {
    schema: ColumnSchema,
    data: BuilderData,
    validity: BitVec,
}

impl ColumnBuilder {
    pub(crate) fn new(schema: ColumnSchema) -> Self {
        let data = match schema.column_type {
            ColumnType::Integer | ColumnType::Timestamp => BuilderData::Int(Vec::new()),
            ColumnType::Float => BuilderData::Float(Vec::new()),
            ColumnType::String => BuilderData::Dict {
                indices: Vec::new(),
                dictionary: Vec::new(),
                dict_map: HashMap::new(),
            },
            ColumnType::Binary => BuilderData::Bytes(Vec::new()),
        };
        Self {
            schema,
            data,
            validity: BitVec::new(),
        }
    }

    pub(crate) fn push(&mut self, value: &Value) -> ColumnarResult<()> {
        let column_type = self.schema.column_type;
        match (&mut self.data, value) {
            (BuilderData::Int(v), Value::Null) => v.push(0),
            (BuilderData::Float(v), Value::Null) => v.push(0.0),
            (BuilderData::Dict { indices, .. }, Value::Null) => indices.push(0),
            (BuilderData::Bytes(v), Value::Null) => v.push(Arc::from(&[][..])),
            (BuilderData::Int(v), Value::Integer(x)) if column_type == ColumnType::Integer => {
                v.push(*x)
            }
            (BuilderData::Int(v), Value::Timestamp(x)) if column_type == ColumnType::Timestamp => {
                v.push(*x)
            }
            (BuilderData::Float(v), Value::Float(x)) => v.push(*x),
            (BuilderData::Float(v), Value::Integer(x)) => v.push(*x as f64),
            (
                BuilderData::Dict {
                    indices,
                    dictionary,
                    dict_map,
                },
                Value::String(s),
            ) => {
                let idx = match dict_map.get(s) {
                    Some(idx) => *idx,
                    None => {
                        let idx = u32::try_from(dictionary.len()).map_err(|_| {
                            ColumnarError::DictionaryOverflow {
                                column: self.schema.name.clone(),
                            }
                        })?;
                        dictionary.push(s.clone());
                        dict_map.insert(s.clone(), idx);
                        idx
                    }
                };
                indices.push(idx);
            }
            (BuilderData::Bytes(v), Value::Binary(b)) => v.push(b.clone()),
            (_, other) => {
                return Err(ColumnarError::TypeMismatch {
                    column: self.schema.name.clone(),
                    expected: column_type,
                    found: other.column_type().unwrap_or(column_type),
                })
            }
        }
        self.validity.push(!value.is_null());
        Ok(())
    }

    pub(crate) fn finish(self) -> Column {
        let data = match self.data {
            BuilderData::Int(v) => ColumnData::Int(v),
            BuilderData::Float(v) => ColumnData::Float(v),
            BuilderData::Dict {
                indices,
                dictionary,
                ..
            } => ColumnData::Dict {
                indices,
                dictionary: Arc::new(dictionary),
            },
            BuilderData::Bytes(v) => ColumnData::Bytes(v),
        };
        let validity = Some(self.validity).filter(|v| !v.all_true());
        Column {
            schema: self.schema,
            data,
            validity,
        }
    }
}
