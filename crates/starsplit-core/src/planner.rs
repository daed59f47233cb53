//! Cost-based column grouping.
//!
//! Columns with few distinct values are merged into groups whose distinct combinations
//! are cheap to store once in a dimension table, with each fact row keeping only an
//! 8-byte surrogate key per group.
//!
//! Two cost models are in play. A candidate group of two or more columns is sized with
//! the *maximum* value width of each member; a lone column is re-checked with its
//! *average* value width (`total_size_bytes / row_count`). The asymmetry is intentional
//! and kept as-is: it makes multi-column groups conservative while letting a single wide,
//! repetitive column still become its own dimension.

use crate::error::{SplitError, SplitResult};
use serde::{Deserialize, Serialize};
use starsplit_columnar::{ColumnStats, TableStats};
use std::cmp::Ordering;

/// Width of a surrogate key column value, in bytes.
pub const KEY_BYTES: u64 = 8;

/// Column ids (zero-based positions in the source table) stored together in one
/// dimension table, in the order they were added.
pub type ColumnGroup = Vec<usize>;

/// Output of [`plan_groups`].
///
/// Every column id of the planned table appears exactly once across `col_groups` and
/// `fact`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub col_groups: Vec<ColumnGroup>,
    pub fact: Vec<usize>,
}

impl Plan {
    /// Whether the table is worth splitting at all.
    pub fn is_split(&self) -> bool {
        !self.col_groups.is_empty()
    }
}

/// Column ids ordered by ascending distinct count; among equal counts the higher id comes
/// first.
pub fn sorted_column_order(columns: &[ColumnStats]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..columns.len()).collect();
    order.sort_by(|&a, &b| {
        match columns[a]
            .approx_distinct_count
            .cmp(&columns[b].approx_distinct_count)
        {
            Ordering::Equal => b.cmp(&a),
            other => other,
        }
    });
    order
}

/// Decide which columns to group into dimension tables.
///
/// Walks the columns in [`sorted_column_order`], growing an open group while the
/// estimated dimension layout is strictly smaller than storing the columns inline. Equal
/// cost never groups.
pub fn plan_groups(stats: &TableStats) -> SplitResult<Plan> {
    if stats.row_count == 0 {
        return Err(SplitError::InvalidInput(
            "cannot estimate storage costs of a table with zero rows".to_string(),
        ));
    }

    let order = sorted_column_order(&stats.columns);
    log::debug!("columns sorted by distinct count: {order:?}");

    let mut plan = Plan::default();
    let mut iter = order.into_iter();
    let Some(first) = iter.next() else {
        return Ok(plan);
    };

    let mut open: ColumnGroup = vec![first];
    for col in iter {
        open.push(col);
        if group_is_cheaper(&open, stats) {
            continue;
        }
        open.pop();
        close_group(std::mem::replace(&mut open, vec![col]), stats, &mut plan);
    }
    close_group(open, stats, &mut plan);

    log::info!(
        "planned {} dimension group(s) {:?}, fact columns {:?}",
        plan.col_groups.len(),
        plan.col_groups,
        plan.fact
    );
    Ok(plan)
}

fn close_group(group: ColumnGroup, stats: &TableStats, plan: &mut Plan) {
    match group.as_slice() {
        [] => {}
        [col] => {
            if column_is_cheaper(&stats.columns[*col], stats.row_count) {
                log::debug!("column {col} becomes its own dimension");
                plan.col_groups.push(group);
            } else {
                plan.fact.push(*col);
            }
        }
        _ => {
            log::debug!("grouped columns {group:?}");
            plan.col_groups.push(group);
        }
    }
}

/// `card * tuple + (rows + card) * 8 < actual`, with `card` the product of distinct
/// counts, `tuple` the sum of maximum value sizes and `actual` the sum of total sizes.
fn group_is_cheaper(group: &[usize], stats: &TableStats) -> bool {
    let mut cardinality: u128 = 1;
    let mut tuple_size: u128 = 0;
    let mut actual: u128 = 0;
    for &col in group {
        let column = &stats.columns[col];
        cardinality = cardinality.saturating_mul(u128::from(column.approx_distinct_count));
        tuple_size = tuple_size.saturating_add(u128::from(column.max_value_size_bytes));
        actual = actual.saturating_add(u128::from(column.total_size_bytes));
    }
    let estimated = cardinality.saturating_mul(tuple_size).saturating_add(
        u128::from(stats.row_count)
            .saturating_add(cardinality)
            .saturating_mul(u128::from(KEY_BYTES)),
    );
    estimated < actual
}

/// `card * (total / rows) + (rows + card) * 8 < total`, multiplied through by `rows`.
fn column_is_cheaper(column: &ColumnStats, row_count: u64) -> bool {
    let rows = u128::from(row_count);
    let cardinality = u128::from(column.approx_distinct_count);
    let total = u128::from(column.total_size_bytes);
    let estimated = cardinality.saturating_mul(total).saturating_add(
        rows.saturating_add(cardinality)
            .saturating_mul(u128::from(KEY_BYTES))
            .saturating_mul(rows),
    );
    estimated < total.saturating_mul(rows)
}
