use proptest::prelude::*;
use starsplit_columnar::{
    Column, ColumnSchema, ColumnType, ColumnarTable, ColumnarTableBuilder, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn build_table(schema: Vec<ColumnSchema>, rows: Vec<Vec<Value>>) -> ColumnarTable {
    let mut builder = ColumnarTableBuilder::new(schema);
    for row in rows {
        builder.append_row(&row).unwrap();
    }
    builder.finalize()
}

fn text(v: &str) -> Value {
    Value::String(Arc::<str>::from(v))
}

#[test]
fn stats_report_sizes_and_distinct_counts() {
    let schema = vec![
        ColumnSchema::new("city", ColumnType::String),
        ColumnSchema::new("zip", ColumnType::Integer),
    ];
    let rows = vec![
        vec![text("Oslo"), Value::Integer(150)],
        vec![text("Bergen"), Value::Integer(5003)],
        vec![text("Oslo"), Value::Null],
        vec![Value::Null, Value::Integer(150)],
    ];
    let stats = build_table(schema, rows).stats();

    assert_eq!(stats.row_count, 4);
    let city = &stats.columns[0];
    assert_eq!(city.approx_distinct_count, 2);
    assert_eq!(city.total_size_bytes, 4 + 6 + 4);
    assert_eq!(city.max_value_size_bytes, 6);
    assert_eq!(city.null_count, 1);

    let zip = &stats.columns[1];
    assert_eq!(zip.approx_distinct_count, 2);
    assert_eq!(zip.total_size_bytes, 24);
    assert_eq!(zip.max_value_size_bytes, 8);
}

#[test]
fn stats_of_empty_table() {
    let table = ColumnarTableBuilder::new(vec![ColumnSchema::new("x", ColumnType::Float)]).finalize();
    let stats = table.stats();
    assert_eq!(stats.row_count, 0);
    assert_eq!(stats.columns[0].approx_distinct_count, 0);
    assert_eq!(stats.columns[0].total_size_bytes, 0);
}

#[test]
fn distinct_count_never_exceeds_row_count() {
    let values: Vec<i64> = (0..5000).collect();
    let table = ColumnarTable::new(vec![Column::integers("id", values)]).unwrap();
    let stats = table.stats();
    assert!(stats.columns[0].approx_distinct_count <= 5000);
    assert!(stats.columns[0].approx_distinct_count > 4500);
}

#[test]
fn group_by_min_on_empty_table_is_empty() {
    let table = build_table(
        vec![
            ColumnSchema::new("k", ColumnType::String),
            ColumnSchema::new("ord", ColumnType::Integer),
        ],
        Vec::new(),
    );
    let out = table.group_by_min(&[0], 1, "p0").unwrap();
    assert_eq!(out.row_count(), 0);
    assert_eq!(out.column_names(), vec!["k", "p0"]);
}

fn small_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (0i64..4).prop_map(Value::Integer),
        prop::sample::select(vec!["x", "y", "z"]).prop_map(text),
    ]
}

proptest! {
    #[test]
    fn distinct_rows_are_unique_and_complete(
        rows in prop::collection::vec((0i64..3, prop::sample::select(vec!["a", "b"])), 0..40)
    ) {
        let table = build_table(
            vec![
                ColumnSchema::new("n", ColumnType::Integer),
                ColumnSchema::new("s", ColumnType::String),
            ],
            rows.iter().map(|(n, s)| vec![Value::Integer(*n), text(s)]).collect(),
        );
        let out = table.distinct(&[0, 1]).unwrap();

        let expected: HashSet<Vec<Value>> = (0..table.row_count()).map(|r| table.row(r)).collect();
        let got: Vec<Vec<Value>> = (0..out.row_count()).map(|r| out.row(r)).collect();
        let got_set: HashSet<Vec<Value>> = got.iter().cloned().collect();
        prop_assert_eq!(got.len(), got_set.len());
        prop_assert_eq!(got_set, expected);
    }

    #[test]
    fn partitioned_min_is_first_row_of_each_partition(
        keys in prop::collection::vec(small_value(), 1..40)
    ) {
        let rows = keys.len();
        let table = ColumnarTable::new(vec![
            Column::integers("ord", (0..rows as i64).collect()),
        ])
        .unwrap();
        // Mixed-type keys are stored as strings to keep one column type.
        let key_column = Column::from_values(
            ColumnSchema::new("k", ColumnType::String),
            keys.iter().map(|v| match v {
                Value::Null => Value::Null,
                other => text(&other.to_string()),
            }),
        )
        .unwrap();
        let table = table.with_column(key_column).unwrap();

        let mins = table.partitioned_min(&[1], 0, "p").unwrap();
        let mut first_seen: HashMap<Value, i64> = HashMap::new();
        for row in 0..rows {
            let key = table.get_cell(row, 1);
            let first = *first_seen.entry(key).or_insert(row as i64);
            prop_assert_eq!(mins.value(row), Value::Integer(first));
        }
    }
}
