//! Star-schema decomposition of flat tables.
//!
//! [`plan_groups`] decides from column statistics which columns are cheaper to store as
//! dimension tables; [`split_star_schema`] performs the rewrite through a [`QueryEngine`].
//! [`decompose`] runs both.

pub mod engine;
pub mod error;
pub mod names;
pub mod planner;
pub mod reassemble;
pub mod splitter;

pub use engine::{ColumnarEngine, QueryEngine};
pub use error::{SplitError, SplitResult};
pub use names::{key_name, NameMapping};
pub use planner::{plan_groups, sorted_column_order, ColumnGroup, Plan, KEY_BYTES};
pub use reassemble::reassemble;
pub use splitter::{ensure_supported_types, split_normalized, split_star_schema, StarSchema};

use starsplit_columnar::ColumnarTable;
use std::time::Instant;

/// A plan together with the star schema it produced.
#[derive(Clone, Debug)]
pub struct Decomposition {
    pub plan: Plan,
    pub schema: StarSchema,
}

/// Type check, gather statistics, plan and split `table`.
///
/// When the plan has no groups the fact table is the source table unchanged and there are
/// no dimensions.
pub fn decompose<E: QueryEngine + ?Sized>(
    engine: &E,
    table: ColumnarTable,
) -> SplitResult<Decomposition> {
    ensure_supported_types(&table)?;

    let started = Instant::now();
    let stats = engine.column_stats(&table)?;
    log::debug!("collected column statistics in {:?}", started.elapsed());

    let plan = plan_groups(&stats)?;
    let names = NameMapping::from_columns(table.column_names());

    let started = Instant::now();
    let schema = split_star_schema(engine, table, &plan.col_groups, &names)?;
    log::debug!(
        "split into {} dimension table(s) in {:?}",
        schema.dims.len(),
        started.elapsed()
    );

    Ok(Decomposition { plan, schema })
}
