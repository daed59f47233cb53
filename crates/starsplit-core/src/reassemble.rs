use crate::engine::QueryEngine;
use crate::error::{SplitError, SplitResult};
use crate::names::key_name;
use crate::splitter::StarSchema;
use starsplit_columnar::ColumnarTable;
use std::collections::HashMap;

/// Join every `p<i>` of the fact table back to dimension `i`.
///
/// Keys are found by position first: the fact table ends with `p0..p<k-1>` and every
/// dimension ends with its key. Only when those positions carry other names are the keys
/// looked up by name, taking the last column so named.
///
/// The result holds the fact table's non-key columns followed by the non-key columns of
/// each dimension, in dimension order, with one row per fact row.
pub fn reassemble<E: QueryEngine + ?Sized>(
    engine: &E,
    schema: &StarSchema,
) -> SplitResult<ColumnarTable> {
    let fact = &schema.fact;
    let fact_keys = fact_key_columns(fact, schema.dims.len())?;

    let attributes: Vec<usize> = (0..fact.column_count())
        .filter(|idx| !fact_keys.contains(idx))
        .collect();
    let mut out = engine.project(fact, &attributes)?;

    for (group_no, (dim, &fact_key)) in schema.dims.iter().zip(&fact_keys).enumerate() {
        let dim_key = dim_key_column(dim, group_no)?;

        let key_column = dim.column(dim_key)?;
        let mut by_key: HashMap<i64, usize> = HashMap::with_capacity(dim.row_count());
        for row in 0..dim.row_count() {
            if let Some(key) = key_column.i64_at(row) {
                by_key.entry(key).or_insert(row);
            }
        }

        let refs = fact.column(fact_key)?;
        let mut rows = Vec::with_capacity(fact.row_count());
        for row in 0..fact.row_count() {
            let dim_row = refs
                .i64_at(row)
                .and_then(|key| by_key.get(&key).copied())
                .ok_or_else(|| {
                    SplitError::InconsistentGrouping(format!(
                        "fact row {row} has no matching row in dimension {group_no}"
                    ))
                })?;
            rows.push(dim_row);
        }

        let dim_attributes: Vec<usize> = (0..dim.column_count()).filter(|&i| i != dim_key).collect();
        for column in engine.project(dim, &dim_attributes)?.take_rows(&rows).into_columns() {
            out = out.with_column(column)?;
        }
    }
    Ok(out)
}

fn is_key_at(table: &ColumnarTable, idx: usize, group_no: usize) -> bool {
    table
        .schema()
        .get(idx)
        .is_some_and(|c| c.name == key_name(group_no))
}

fn last_column_named(table: &ColumnarTable, name: &str) -> Option<usize> {
    table.schema().iter().rposition(|c| c.name == name)
}

fn fact_key_columns(fact: &ColumnarTable, dim_count: usize) -> SplitResult<Vec<usize>> {
    if let Some(first) = fact.column_count().checked_sub(dim_count) {
        if (0..dim_count).all(|group_no| is_key_at(fact, first + group_no, group_no)) {
            return Ok((first..fact.column_count()).collect());
        }
    }

    let mut keys = Vec::with_capacity(dim_count);
    for group_no in 0..dim_count {
        let name = key_name(group_no);
        let idx = last_column_named(fact, &name).ok_or_else(|| {
            SplitError::InconsistentGrouping(format!("fact table has no key column {name}"))
        })?;
        keys.push(idx);
    }
    Ok(keys)
}

fn dim_key_column(dim: &ColumnarTable, group_no: usize) -> SplitResult<usize> {
    if let Some(last) = dim.column_count().checked_sub(1) {
        if is_key_at(dim, last, group_no) {
            return Ok(last);
        }
    }
    let name = key_name(group_no);
    last_column_named(dim, &name).ok_or_else(|| {
        SplitError::InconsistentGrouping(format!("dimension {group_no} has no key column {name}"))
    })
}
