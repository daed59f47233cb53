//! Parquet persistence via the Arrow bridge (uncompressed).

use crate::arrow::{columnar_to_record_batch, record_batch_to_columnar};
use crate::error::ColumnarResult;
use crate::table::ColumnarTable;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::reader::ChunkReader;
use std::io::Write;

pub fn write_columnar_to_parquet<W: Write + Send>(
    table: &ColumnarTable,
    writer: W,
) -> ColumnarResult<W> {
    let batch = columnar_to_record_batch(table)?;
    let mut writer = ArrowWriter::try_new(writer, batch.schema(), None)?;
    writer.write(&batch)?;
    Ok(writer.into_inner()?)
}

pub fn read_parquet_to_columnar<R: ChunkReader + 'static>(reader: R) -> ColumnarResult<ColumnarTable> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(reader)?.build()?;
    let mut tables = Vec::new();
    for batch in reader {
        tables.push(record_batch_to_columnar(&batch?)?);
    }
    concat_tables(tables)
}

fn concat_tables(tables: Vec<ColumnarTable>) -> ColumnarResult<ColumnarTable> {
    let mut tables = tables.into_iter();
    let Some(first) = tables.next() else {
        return Ok(ColumnarTable::default());
    };
    let schema = first.schema().to_vec();
    let mut builder = crate::ColumnarTableBuilder::new(schema);
    for table in std::iter::once(first).chain(tables) {
        for row in 0..table.row_count() {
            builder.append_row(&table.row(row))?;
        }
    }
    Ok(builder.finalize())
}
