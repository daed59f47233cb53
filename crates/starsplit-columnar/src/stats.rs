#![forbid(unsafe_code)]

use crate::table::{Column, ColumnarTable};
use crate::types::ColumnType;
use std::collections::HashSet;

/// Storage statistics for one column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnStats {
    pub column_type: ColumnType,
    /// Estimated number of distinct non-null values, never above the row count.
    pub approx_distinct_count: u64,
    /// Sum of the byte sizes of every value (nulls count as zero).
    pub total_size_bytes: u64,
    /// Largest single value, in bytes.
    pub max_value_size_bytes: u64,
    pub null_count: u64,
}

/// Statistics for a whole table, in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    pub row_count: u64,
    pub columns: Vec<ColumnStats>,
}

impl TableStats {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

pub(crate) fn table_stats(table: &ColumnarTable) -> TableStats {
    let row_count = table.row_count() as u64;
    let columns = table
        .columns()
        .iter()
        .map(|column| column_stats(column, row_count))
        .collect();
    TableStats { row_count, columns }
}

fn column_stats(column: &Column, row_count: u64) -> ColumnStats {
    let mut distinct = DistinctCounter::new();
    let mut stats = ColumnStats {
        column_type: column.column_type(),
        ..ColumnStats::default()
    };

    for row in 0..column.len() {
        let Some(hash) = column.stable_hash(row) else {
            stats.null_count += 1;
            continue;
        };
        distinct.insert_hash(hash);
        let size = column.value_size(row);
        stats.total_size_bytes += size;
        stats.max_value_size_bytes = stats.max_value_size_bytes.max(size);
    }

    // HLL can overshoot on small inputs; the estimate must stay within the row count.
    stats.approx_distinct_count = distinct.estimate().min(row_count);
    stats
}

#[derive(Clone, Debug)]
pub(crate) struct HyperLogLog {
    p: u8,
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub fn with_precision(p: u8) -> Self {
        debug_assert!((4..=16).contains(&p));
        Self {
            p,
            registers: vec![0u8; 1 << p],
        }
    }

    pub fn insert_hash(&mut self, hash: u64) {
        let idx = (hash >> (64 - self.p)) as usize;
        let w = hash << self.p;
        let rank = (w.leading_zeros() + 1) as u8;
        self.registers[idx] = self.registers[idx].max(rank);
    }

    pub fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        };

        let mut inv_sum = 0.0;
        let mut zeros = 0u32;
        for &r in &self.registers {
            inv_sum += 2f64.powi(-(r as i32));
            if r == 0 {
                zeros += 1;
            }
        }

        let raw = alpha * m * m / inv_sum;

        // Small range correction.
        if raw <= 2.5 * m && zeros > 0 {
            let z = zeros as f64;
            return (m * (m / z).ln()).round().max(0.0) as u64;
        }

        raw.round().max(0.0) as u64
    }
}

pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// FNV-1a, stable across runs and platforms.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

/// Exact distinct counting that spills into a HyperLogLog sketch once the exact set
/// grows past a threshold.
#[derive(Clone, Debug)]
pub(crate) enum DistinctCounter {
    Exact(HashSet<u64>),
    Hll(HyperLogLog),
}

impl DistinctCounter {
    const EXACT_THRESHOLD: usize = 2048;
    const HLL_PRECISION: u8 = 12;

    pub fn new() -> Self {
        Self::Exact(HashSet::new())
    }

    pub fn insert_hash(&mut self, hash: u64) {
        match self {
            Self::Exact(set) => {
                if set.len() >= Self::EXACT_THRESHOLD && !set.contains(&hash) {
                    let mut hll = HyperLogLog::with_precision(Self::HLL_PRECISION);
                    for &h in set.iter() {
                        hll.insert_hash(h);
                    }
                    hll.insert_hash(hash);
                    *self = Self::Hll(hll);
                } else {
                    set.insert(hash);
                }
            }
            Self::Hll(hll) => hll.insert_hash(hash),
        }
    }

    pub fn estimate(&self) -> u64 {
        match self {
            Self::Exact(set) => set.len() as u64,
            Self::Hll(hll) => hll.estimate(),
        }
    }
}
