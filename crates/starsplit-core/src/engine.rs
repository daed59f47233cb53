use crate::error::SplitResult;
use starsplit_columnar::{Column, ColumnarTable, TableStats};
use std::fmt;

/// Query capabilities the planner and splitter rely on.
///
/// The pipeline never touches table internals directly; everything that needs a scan, a
/// grouping or a window goes through this trait so another engine can be swapped in.
/// Operations must be deterministic: group-by output ordered by the minimum of the
/// aggregated column, distinct output by first occurrence.
pub trait QueryEngine: fmt::Debug {
    /// Per-column statistics plus the row count.
    fn column_stats(&self, table: &ColumnarTable) -> SplitResult<TableStats>;

    /// `SELECT group_cols..., min(agg_col) AS out_name GROUP BY group_cols`.
    fn group_by_min(
        &self,
        table: &ColumnarTable,
        group_cols: &[usize],
        agg_col: usize,
        out_name: &str,
    ) -> SplitResult<ColumnarTable>;

    /// `SELECT DISTINCT cols...`.
    fn distinct(&self, table: &ColumnarTable, cols: &[usize]) -> SplitResult<ColumnarTable>;

    /// `min(agg_col) OVER (PARTITION BY partition_cols)` for every row.
    fn partitioned_min(
        &self,
        table: &ColumnarTable,
        partition_cols: &[usize],
        agg_col: usize,
        out_name: &str,
    ) -> SplitResult<Column>;

    fn project(&self, table: &ColumnarTable, cols: &[usize]) -> SplitResult<ColumnarTable>;
}

/// [`QueryEngine`] backed by the in-memory `starsplit-columnar` tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnarEngine;

impl QueryEngine for ColumnarEngine {
    fn column_stats(&self, table: &ColumnarTable) -> SplitResult<TableStats> {
        Ok(table.stats())
    }

    fn group_by_min(
        &self,
        table: &ColumnarTable,
        group_cols: &[usize],
        agg_col: usize,
        out_name: &str,
    ) -> SplitResult<ColumnarTable> {
        Ok(table.group_by_min(group_cols, agg_col, out_name)?)
    }

    fn distinct(&self, table: &ColumnarTable, cols: &[usize]) -> SplitResult<ColumnarTable> {
        Ok(table.distinct(cols)?)
    }

    fn partitioned_min(
        &self,
        table: &ColumnarTable,
        partition_cols: &[usize],
        agg_col: usize,
        out_name: &str,
    ) -> SplitResult<Column> {
        Ok(table.partitioned_min(partition_cols, agg_col, out_name)?)
    }

    fn project(&self, table: &ColumnarTable, cols: &[usize]) -> SplitResult<ColumnarTable> {
        Ok(table.project(cols)?)
    }
}
