//! Rewrites a flat table into a fact table plus one dimension table per column group.

use crate::engine::QueryEngine;
use crate::error::{SplitError, SplitResult};
use crate::names::{key_name, NameMapping};
use crate::planner::ColumnGroup;
use starsplit_columnar::{Column, ColumnType, ColumnarTable};
use std::time::Instant;

/// Temporary row-ordinal column appended while a group is factored out.
const ROW_ORDINAL: &str = "key";

/// A fact table whose `p<i>` columns reference `dims[i]`.
#[derive(Clone, Debug, Default)]
pub struct StarSchema {
    pub fact: ColumnarTable,
    pub dims: Vec<ColumnarTable>,
}

/// Columns of the fact table while it is being rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FactColumn {
    Source(usize),
    Key(usize),
}

/// Fail with [`SplitError::UnsupportedColumnType`] on the first binary column.
pub fn ensure_supported_types(table: &ColumnarTable) -> SplitResult<()> {
    match table
        .schema()
        .iter()
        .find(|c| c.column_type == ColumnType::Binary)
    {
        Some(column) => Err(SplitError::UnsupportedColumnType {
            column: column.name.clone(),
            column_type: column.column_type,
        }),
        None => Ok(()),
    }
}

fn validate_groups(col_groups: &[ColumnGroup], column_count: usize) -> SplitResult<()> {
    let mut used = vec![false; column_count];
    for (group_no, group) in col_groups.iter().enumerate() {
        if group.is_empty() {
            return Err(SplitError::InconsistentGrouping(format!(
                "group {group_no} is empty"
            )));
        }
        for &col in group {
            match used.get_mut(col) {
                None => {
                    return Err(SplitError::InconsistentGrouping(format!(
                        "group {group_no} references column {col}, table has {column_count} columns"
                    )))
                }
                Some(true) => {
                    return Err(SplitError::InconsistentGrouping(format!(
                        "column {col} is assigned to more than one group"
                    )))
                }
                Some(slot) => *slot = true,
            }
        }
    }
    Ok(())
}

/// Factor each of `col_groups` out of `table` into its own dimension table.
///
/// Dimension `i` holds the distinct combinations of group `i` (original names, group
/// order) followed by the surrogate key `p<i>`, which is the lowest row ordinal at which
/// the combination occurs. The fact table keeps the ungrouped columns in source order
/// followed by `p0, p1, ...`. Joining `fact.p<i> = dims[i].p<i>` restores every row.
pub fn split_star_schema<E: QueryEngine + ?Sized>(
    engine: &E,
    table: ColumnarTable,
    col_groups: &[ColumnGroup],
    names: &NameMapping,
) -> SplitResult<StarSchema> {
    ensure_supported_types(&table)?;
    validate_groups(col_groups, table.column_count())?;
    if names.len() != table.column_count() {
        return Err(SplitError::InconsistentGrouping(format!(
            "name mapping covers {} columns, table has {}",
            names.len(),
            table.column_count()
        )));
    }

    let mut layout: Vec<FactColumn> = (0..table.column_count()).map(FactColumn::Source).collect();
    let mut fact = table.rename(names.synthetic_names())?;
    let mut dims = Vec::with_capacity(col_groups.len());

    for (group_no, group) in col_groups.iter().enumerate() {
        let started = Instant::now();
        let key = key_name(group_no);

        let positions = group
            .iter()
            .map(|&col| {
                layout
                    .iter()
                    .position(|c| *c == FactColumn::Source(col))
                    .ok_or_else(|| {
                        SplitError::InconsistentGrouping(format!(
                            "column {col} is no longer in the fact table"
                        ))
                    })
            })
            .collect::<SplitResult<Vec<usize>>>()?;

        let ordinal = fact.column_count();
        let rows = fact.row_count() as i64;
        let augmented = fact.with_column(Column::integers(ROW_ORDINAL, (0..rows).collect()))?;

        let dim = engine.group_by_min(&augmented, &positions, ordinal, &key)?;
        let mut dim_names = Vec::with_capacity(group.len() + 1);
        for &col in group {
            dim_names.push(original_name(names, col)?);
        }
        dim_names.push(key.clone());
        let dim = dim.rename(dim_names)?;

        let key_column = engine.partitioned_min(&augmented, &positions, ordinal, &key)?;
        let keep: Vec<usize> = (0..layout.len())
            .filter(|idx| !positions.contains(idx))
            .collect();
        fact = engine.project(&augmented, &keep)?.with_column(key_column)?;
        layout = keep
            .iter()
            .map(|&idx| layout[idx])
            .chain(std::iter::once(FactColumn::Key(group_no)))
            .collect();

        log::debug!(
            "factored group {group_no} {group:?} into {} dimension rows in {:?}",
            dim.row_count(),
            started.elapsed()
        );
        dims.push(dim);
    }

    let mut fact_names = Vec::with_capacity(layout.len());
    for column in &layout {
        fact_names.push(match *column {
            FactColumn::Source(col) => original_name(names, col)?,
            FactColumn::Key(group_no) => key_name(group_no),
        });
    }
    let fact = fact.rename(fact_names)?;

    Ok(StarSchema { fact, dims })
}

fn original_name(names: &NameMapping, col: usize) -> SplitResult<String> {
    names
        .original(&NameMapping::synthetic_for_index(col))
        .map(str::to_owned)
        .ok_or_else(|| SplitError::InconsistentGrouping(format!("no name for column {col}")))
}

/// Distinct combinations of each group of named columns, in first-occurrence order.
///
/// Groups may overlap; a column can appear in several output tables.
pub fn split_normalized<E: QueryEngine + ?Sized>(
    engine: &E,
    table: &ColumnarTable,
    groups: &[Vec<String>],
) -> SplitResult<Vec<ColumnarTable>> {
    ensure_supported_types(table)?;

    let mut resolved = Vec::with_capacity(groups.len());
    for (group_no, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(SplitError::InconsistentGrouping(format!(
                "group {group_no} is empty"
            )));
        }
        let mut cols = Vec::with_capacity(group.len());
        for name in group {
            let idx = table.column_index(name).ok_or_else(|| {
                SplitError::InconsistentGrouping(format!("unknown column {name:?}"))
            })?;
            if cols.contains(&idx) {
                return Err(SplitError::InconsistentGrouping(format!(
                    "column {name:?} listed twice in group {group_no}"
                )));
            }
            cols.push(idx);
        }
        resolved.push(cols);
    }

    let mut tables = Vec::with_capacity(resolved.len());
    for cols in &resolved {
        let started = Instant::now();
        let table = engine.distinct(table, cols)?;
        log::debug!(
            "normalized {:?} into {} rows in {:?}",
            table.column_names(),
            table.row_count(),
            started.elapsed()
        );
        tables.push(table);
    }
    Ok(tables)
}
