#![forbid(unsafe_code)]

//! Relational primitives over [`ColumnarTable`]: grouping, distinct projection and
//! windowed minimums.
//!
//! Every operation here is deterministic. Groups are numbered in order of first
//! occurrence, never in hash-map iteration order, so outputs are stable for a fixed
//! input.

use crate::error::{ColumnarError, ColumnarResult};
use crate::table::{Column, ColumnSchema, ColumnarTable};
use crate::types::{ColumnType, Value};
use std::collections::HashMap;

/// Assignment of every row to a group of equal key values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowGroups {
    /// Group id of each row; ids are dense and ordered by first occurrence.
    pub group_of_row: Vec<usize>,
    /// First (lowest) row index of each group.
    pub first_rows: Vec<usize>,
}

impl RowGroups {
    pub fn group_count(&self) -> usize {
        self.first_rows.len()
    }
}

impl ColumnarTable {
    /// Partition rows by the values of `cols`. Nulls compare equal to each other.
    pub fn group_rows(&self, cols: &[usize]) -> ColumnarResult<RowGroups> {
        let mut codes = Vec::with_capacity(cols.len());
        for &col in cols {
            codes.push(self.column(col)?.key_codes());
        }

        let rows = self.row_count();
        let mut group_of_row = Vec::with_capacity(rows);
        let mut first_rows = Vec::new();

        if let [single] = codes.as_slice() {
            // Codes of one column are already dense; only renumber by first occurrence.
            let mut remap: HashMap<usize, usize> = HashMap::new();
            for (row, code) in single.iter().enumerate() {
                let next = first_rows.len();
                let gid = *remap.entry(*code).or_insert_with(|| {
                    first_rows.push(row);
                    next
                });
                group_of_row.push(gid);
            }
        } else {
            let mut index: HashMap<Vec<usize>, usize> = HashMap::new();
            let mut key: Vec<usize> = Vec::with_capacity(codes.len());
            for row in 0..rows {
                key.clear();
                key.extend(codes.iter().map(|c| c[row]));
                let gid = match index.get(&key) {
                    Some(gid) => *gid,
                    None => {
                        let gid = first_rows.len();
                        index.insert(key.clone(), gid);
                        first_rows.push(row);
                        gid
                    }
                };
                group_of_row.push(gid);
            }
        }

        Ok(RowGroups {
            group_of_row,
            first_rows,
        })
    }

    /// Distinct combinations of `cols`, in order of first occurrence.
    pub fn distinct(&self, cols: &[usize]) -> ColumnarResult<ColumnarTable> {
        let groups = self.group_rows(cols)?;
        self.project(cols).map(|t| t.take_rows(&groups.first_rows))
    }

    /// `SELECT cols..., min(agg_col) AS agg_name GROUP BY cols`.
    ///
    /// Groups are emitted in order of first occurrence. `agg_col` must be an integer or
    /// timestamp column; nulls are ignored and an all-null group yields a null minimum.
    pub fn group_by_min(
        &self,
        cols: &[usize],
        agg_col: usize,
        agg_name: &str,
    ) -> ColumnarResult<ColumnarTable> {
        let groups = self.group_rows(cols)?;
        let mins = self.group_minimums(&groups, agg_col)?;
        let agg_type = self.column(agg_col)?.column_type();

        let keys = self.project(cols)?.take_rows(&groups.first_rows);
        let min_column = Column::from_values(
            ColumnSchema::new(agg_name, agg_type),
            mins.into_iter().map(|m| min_value(agg_type, m)),
        )?;
        keys.with_column(min_column)
    }

    /// `min(agg_col) OVER (PARTITION BY cols)` evaluated for every row, returned as a
    /// column named `name`.
    pub fn partitioned_min(
        &self,
        cols: &[usize],
        agg_col: usize,
        name: &str,
    ) -> ColumnarResult<Column> {
        let groups = self.group_rows(cols)?;
        let mins = self.group_minimums(&groups, agg_col)?;
        let agg_type = self.column(agg_col)?.column_type();
        Column::from_values(
            ColumnSchema::new(name, agg_type),
            groups
                .group_of_row
                .iter()
                .map(|gid| min_value(agg_type, mins[*gid])),
        )
    }

    fn group_minimums(&self, groups: &RowGroups, agg_col: usize) -> ColumnarResult<Vec<Option<i64>>> {
        let column = self.column(agg_col)?;
        match column.column_type() {
            ColumnType::Integer | ColumnType::Timestamp => {}
            other => {
                return Err(ColumnarError::TypeMismatch {
                    column: column.name().to_owned(),
                    expected: ColumnType::Integer,
                    found: other,
                })
            }
        }

        let mut mins: Vec<Option<i64>> = vec![None; groups.group_count()];
        for (row, gid) in groups.group_of_row.iter().enumerate() {
            if let Some(v) = column.i64_at(row) {
                let slot = &mut mins[*gid];
                *slot = Some(slot.map_or(v, |m| m.min(v)));
            }
        }
        Ok(mins)
    }
}

fn min_value(column_type: ColumnType, min: Option<i64>) -> Value {
    match (column_type, min) {
        (_, None) => Value::Null,
        (ColumnType::Timestamp, Some(v)) => Value::Timestamp(v),
        (_, Some(v)) => Value::Integer(v),
    }
}
