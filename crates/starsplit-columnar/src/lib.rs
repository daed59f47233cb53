//! In-memory columnar tables for star-schema decomposition.
//!
//! This crate focuses on:
//! - Typed columns with dictionary-encoded strings and validity bitmaps.
//! - Storage statistics (approximate distinct counts, total and maximum value sizes).
//! - Deterministic relational primitives: group-by with a minimum aggregate, distinct
//!   projection and a partitioned (windowed) minimum.

#![forbid(unsafe_code)]

mod bitmap;
mod error;
mod query;
mod stats;
mod table;
mod types;

#[cfg(feature = "arrow")]
pub mod arrow;
#[cfg(feature = "arrow")]
pub mod parquet;

pub use crate::bitmap::BitVec;
pub use crate::error::{ColumnarError, ColumnarResult};
pub use crate::query::RowGroups;
pub use crate::stats::{ColumnStats, TableStats};
pub use crate::table::{Column, ColumnSchema, ColumnarTable, ColumnarTableBuilder};
pub use crate::types::{ColumnType, Value};
