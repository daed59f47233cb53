//! Conversions between [`ColumnarTable`] and Arrow [`RecordBatch`]es.

use crate::error::{ColumnarError, ColumnarResult};
use crate::table::{Column, ColumnSchema, ColumnarTable};
use crate::types::{ColumnType, Value};
use arrow_array::{
    Array, ArrayRef, BinaryArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, StringArray, TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::String => DataType::Utf8,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
        ColumnType::Binary => DataType::Binary,
    }
}

fn column_to_array(column: &Column) -> ArrayRef {
    let values = column.values();
    match column.column_type() {
        ColumnType::Integer => Arc::new(Int64Array::from(
            values.iter().map(Value::as_i64).collect::<Vec<_>>(),
        )),
        ColumnType::Timestamp => Arc::new(TimestampMillisecondArray::from(
            values.iter().map(Value::as_i64).collect::<Vec<_>>(),
        )),
        ColumnType::Float => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::String => Arc::new(StringArray::from(
            values.iter().map(Value::as_str).collect::<Vec<_>>(),
        )),
        ColumnType::Binary => Arc::new(BinaryArray::from_opt_vec(
            values
                .iter()
                .map(|v| match v {
                    Value::Binary(b) => Some(b.as_ref()),
                    _ => None,
                })
                .collect(),
        )),
    }
}

pub fn columnar_to_record_batch(table: &ColumnarTable) -> ColumnarResult<RecordBatch> {
    let fields: Vec<Field> = table
        .schema()
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c.column_type), true))
        .collect();
    let arrays: Vec<ArrayRef> = table.columns().iter().map(column_to_array).collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn array_to_values(name: &str, array: &dyn Array) -> ColumnarResult<(ColumnType, Vec<Value>)> {
    let len = array.len();
    macro_rules! collect {
        ($ty:ty, $column_type:expr, $wrap:expr) => {{
            let typed = array
                .as_any()
                .downcast_ref::<$ty>()
                .ok_or_else(|| unsupported(name, array.data_type()))?;
            let values = (0..len)
                .map(|i| {
                    if typed.is_null(i) {
                        Value::Null
                    } else {
                        $wrap(typed.value(i))
                    }
                })
                .collect();
            ($column_type, values)
        }};
    }

    Ok(match array.data_type() {
        DataType::Int64 => collect!(Int64Array, ColumnType::Integer, Value::Integer),
        DataType::Int32 => collect!(Int32Array, ColumnType::Integer, |v: i32| Value::Integer(v as i64)),
        DataType::Float64 => collect!(Float64Array, ColumnType::Float, Value::Float),
        DataType::Float32 => collect!(Float32Array, ColumnType::Float, |v: f32| Value::Float(v as f64)),
        DataType::Utf8 => collect!(StringArray, ColumnType::String, |v: &str| Value::from(v)),
        DataType::LargeUtf8 => {
            collect!(LargeStringArray, ColumnType::String, |v: &str| Value::from(v))
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => collect!(
            TimestampMillisecondArray,
            ColumnType::Timestamp,
            Value::Timestamp
        ),
        DataType::Binary => collect!(BinaryArray, ColumnType::Binary, |v: &[u8]| Value::Binary(
            Arc::from(v)
        )),
        other => return Err(unsupported(name, other)),
    })
}

fn unsupported(column: &str, data_type: &DataType) -> ColumnarError {
    ColumnarError::UnsupportedArrowType {
        column: column.to_owned(),
        data_type: data_type.to_string(),
    }
}

pub fn record_batch_to_columnar(batch: &RecordBatch) -> ColumnarResult<ColumnarTable> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let (column_type, values) = array_to_values(field.name(), array.as_ref())?;
        columns.push(Column::from_values(
            ColumnSchema::new(field.name().clone(), column_type),
            values,
        )?);
    }
    ColumnarTable::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_batch_roundtrip_preserves_cells() {
        let table = ColumnarTable::new(vec![
            Column::integers("id", vec![1, 2, 3]),
            Column::from_values(
                ColumnSchema::new("name", ColumnType::String),
                [Value::from("a"), Value::Null, Value::from("a")],
            )
            .unwrap(),
            Column::from_values(
                ColumnSchema::new("at", ColumnType::Timestamp),
                [Value::Timestamp(5), Value::Timestamp(6), Value::Null],
            )
            .unwrap(),
        ])
        .unwrap();

        let batch = columnar_to_record_batch(&table).unwrap();
        assert_eq!(batch.num_rows(), 3);
        let back = record_batch_to_columnar(&batch).unwrap();
        assert_eq!(back.schema(), table.schema());
        assert_eq!(back.to_values(), table.to_values());
    }
}
