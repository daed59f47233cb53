use pretty_assertions::assert_eq;
use proptest::prelude::*;
use starsplit_columnar::{Column, ColumnSchema, ColumnType, ColumnarTable, Value};
use starsplit_core::{
    decompose, reassemble, split_normalized, split_star_schema, ColumnGroup, ColumnarEngine,
    NameMapping, Plan, SplitError, StarSchema,
};
use std::collections::HashSet;

fn strings(name: &str, values: &[Option<&str>]) -> Column {
    Column::from_values(
        ColumnSchema::new(name, ColumnType::String),
        values.iter().map(|v| v.map_or(Value::Null, Value::from)),
    )
    .unwrap()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Integer).collect()
}

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().copied().map(Value::from).collect()
}

/// region, country, amount
fn sales() -> ColumnarTable {
    ColumnarTable::new(vec![
        strings("region", &[Some("eu"), Some("us"), Some("eu"), Some("eu"), Some("us")]),
        strings("country", &[Some("no"), Some("us"), Some("no"), Some("se"), Some("us")]),
        Column::integers("amount", vec![10, 20, 30, 40, 50]),
    ])
    .unwrap()
}

fn split(table: ColumnarTable, groups: &[ColumnGroup]) -> Result<StarSchema, SplitError> {
    let names = NameMapping::from_columns(table.column_names());
    split_star_schema(&ColumnarEngine, table, groups, &names)
}

fn column_by_name(table: &ColumnarTable, name: &str) -> Vec<Value> {
    let idx = table.column_index(name).unwrap();
    table.column(idx).unwrap().values()
}

fn assert_reassembles(original: &ColumnarTable, schema: &StarSchema) {
    let joined = reassemble(&ColumnarEngine, schema).unwrap();
    assert_eq!(joined.row_count(), original.row_count());
    assert_eq!(joined.column_count(), original.column_count());
    for name in original.column_names() {
        assert_eq!(column_by_name(&joined, &name), column_by_name(original, &name), "{name}");
    }
}

/// Follow every fact row's keys into the dimensions by position and compare with the
/// source cells, without going through `reassemble`.
fn assert_keys_resolve(original: &ColumnarTable, groups: &[ColumnGroup], schema: &StarSchema) {
    let fact = &schema.fact;
    let fact_cols: Vec<usize> = (0..original.column_count())
        .filter(|col| !groups.iter().any(|g| g.contains(col)))
        .collect();
    let first_key = fact_cols.len();
    assert_eq!(fact.column_count(), first_key + groups.len());
    assert_eq!(fact.row_count(), original.row_count());

    for row in 0..original.row_count() {
        for (pos, &src) in fact_cols.iter().enumerate() {
            assert_eq!(fact.get_cell(row, pos), original.get_cell(row, src), "row {row}");
        }
        for (group_no, (group, dim)) in groups.iter().zip(&schema.dims).enumerate() {
            let key = fact.get_cell(row, first_key + group_no);
            let dim_key = dim.column_count() - 1;
            let hits: Vec<usize> = (0..dim.row_count())
                .filter(|&r| dim.get_cell(r, dim_key) == key)
                .collect();
            assert_eq!(hits.len(), 1, "row {row} key {key:?} in dimension {group_no}");
            for (pos, &src) in group.iter().enumerate() {
                assert_eq!(dim.get_cell(hits[0], pos), original.get_cell(row, src));
            }
        }
    }
}

#[test]
fn factors_group_into_dimension() {
    let schema = split(sales(), &[vec![1, 0]]).unwrap();

    assert_eq!(schema.dims.len(), 1);
    let dim = &schema.dims[0];
    assert_eq!(dim.column_names(), vec!["country", "region", "p0"]);
    assert_eq!(
        dim.to_values(),
        vec![
            text(&["no", "us", "se"]),
            text(&["eu", "us", "eu"]),
            ints(&[0, 1, 3]),
        ]
    );

    assert_eq!(schema.fact.column_names(), vec!["amount", "p0"]);
    assert_eq!(
        schema.fact.to_values(),
        vec![ints(&[10, 20, 30, 40, 50]), ints(&[0, 1, 0, 3, 1])]
    );
    assert_keys_resolve(&sales(), &[vec![1, 0]], &schema);
    assert_reassembles(&sales(), &schema);
}

#[test]
fn later_groups_see_rewritten_fact() {
    let schema = split(sales(), &[vec![0], vec![2]]).unwrap();

    assert_eq!(schema.fact.column_names(), vec!["country", "p0", "p1"]);
    assert_eq!(column_by_name(&schema.fact, "p0"), ints(&[0, 1, 0, 0, 1]));
    assert_eq!(column_by_name(&schema.fact, "p1"), ints(&[0, 1, 2, 3, 4]));
    assert_eq!(schema.dims[0].column_names(), vec!["region", "p0"]);
    assert_eq!(schema.dims[1].column_names(), vec!["amount", "p1"]);
    assert_keys_resolve(&sales(), &[vec![0], vec![2]], &schema);
    assert_reassembles(&sales(), &schema);
}

#[test]
fn every_column_grouped_leaves_only_keys() {
    let schema = split(sales(), &[vec![0, 1, 2]]).unwrap();
    assert_eq!(schema.fact.column_names(), vec!["p0"]);
    assert_eq!(schema.fact.row_count(), 5);
    assert_eq!(schema.dims[0].row_count(), 5);
    assert_reassembles(&sales(), &schema);
}

#[test]
fn no_groups_keeps_source_table() {
    let schema = split(sales(), &[]).unwrap();
    assert!(schema.dims.is_empty());
    assert_eq!(schema.fact.column_names(), sales().column_names());
    assert_eq!(schema.fact.to_values(), sales().to_values());
    assert_keys_resolve(&sales(), &[], &schema);
}

#[test]
fn nulls_group_together() {
    let table = ColumnarTable::new(vec![
        strings("tag", &[None, Some("a"), None, Some("a")]),
        Column::integers("n", vec![1, 2, 3, 4]),
    ])
    .unwrap();
    let schema = split(table.clone(), &[vec![0]]).unwrap();
    assert_eq!(
        schema.dims[0].to_values(),
        vec![vec![Value::Null, Value::from("a")], ints(&[0, 1])]
    );
    assert_reassembles(&table, &schema);
}

#[test]
fn rejects_inconsistent_groups() {
    for groups in [
        vec![vec![0], vec![0, 1]],
        vec![vec![3]],
        vec![vec![]],
        vec![vec![1, 1]],
    ] {
        let err = split(sales(), &groups).unwrap_err();
        assert!(matches!(err, SplitError::InconsistentGrouping(_)), "{groups:?}: {err}");
    }
}

#[test]
fn rejects_incomplete_name_mapping() {
    let names = NameMapping::from_columns(["region", "country"]);
    let err = split_star_schema(&ColumnarEngine, sales(), &[vec![0]], &names).unwrap_err();
    assert!(matches!(err, SplitError::InconsistentGrouping(_)));
}

#[test]
fn rejects_binary_columns() {
    let table = sales()
        .with_column(
            Column::from_values(
                ColumnSchema::new("blob", ColumnType::Binary),
                (0..5u8).map(|b| Value::Binary(vec![b].into())),
            )
            .unwrap(),
        )
        .unwrap();
    let err = split(table.clone(), &[vec![0]]).unwrap_err();
    assert!(
        matches!(&err, SplitError::UnsupportedColumnType { column, .. } if column == "blob"),
        "{err}"
    );
    let err = decompose(&ColumnarEngine, table).unwrap_err();
    assert!(matches!(err, SplitError::UnsupportedColumnType { .. }));
}

#[test]
fn source_column_named_like_fact_key_survives_join() {
    let table = ColumnarTable::new(vec![
        strings("region", &[Some("eu"), Some("us"), Some("eu"), Some("eu")]),
        Column::integers("p0", vec![100, 200, 300, 400]),
    ])
    .unwrap();
    let groups = vec![vec![0]];
    let schema = split(table.clone(), &groups).unwrap();

    assert_eq!(schema.fact.column_names(), vec!["p0", "p0"]);
    assert_eq!(
        schema.fact.to_values(),
        vec![ints(&[100, 200, 300, 400]), ints(&[0, 1, 0, 0])]
    );
    assert_keys_resolve(&table, &groups, &schema);

    let joined = reassemble(&ColumnarEngine, &schema).unwrap();
    assert_eq!(joined.column_names(), vec!["p0", "region"]);
    assert_eq!(
        joined.to_values(),
        vec![ints(&[100, 200, 300, 400]), text(&["eu", "us", "eu", "eu"])]
    );
}

#[test]
fn grouped_column_named_like_dimension_key_survives_join() {
    let table = ColumnarTable::new(vec![
        Column::integers("p0", vec![7, 7, 8]),
        strings("p1", &[Some("a"), Some("b"), Some("a")]),
        Column::integers("amount", vec![1, 2, 3]),
    ])
    .unwrap();
    let groups = vec![vec![0], vec![1]];
    let schema = split(table.clone(), &groups).unwrap();

    assert_eq!(schema.dims[0].column_names(), vec!["p0", "p0"]);
    assert_eq!(schema.dims[1].column_names(), vec!["p1", "p1"]);
    assert_keys_resolve(&table, &groups, &schema);
    assert_reassembles(&table, &schema);
}

#[test]
fn reassembly_falls_back_to_key_names() {
    let mut schema = split(sales(), &[vec![0]]).unwrap();
    // Move the key in front of the surviving columns.
    schema.fact = schema.fact.project(&[2, 0, 1]).unwrap();
    assert_eq!(schema.fact.column_names(), vec!["p0", "country", "amount"]);
    assert_reassembles(&sales(), &schema);
}

#[test]
fn reassembly_detects_dangling_keys() {
    let mut schema = split(sales(), &[vec![0]]).unwrap();
    schema.dims[0] = schema.dims[0].take_rows(&[0]);
    let err = reassemble(&ColumnarEngine, &schema).unwrap_err();
    assert!(matches!(err, SplitError::InconsistentGrouping(_)));
}

#[test]
fn normalized_split_emits_distinct_combinations() {
    let table = ColumnarTable::new(vec![
        Column::integers("a", vec![1, 1, 2, 2, 1]),
        strings("b", &[Some("x"), Some("x"), Some("y"), Some("z"), Some("x")]),
        Column::integers("c", vec![7, 8, 7, 8, 7]),
    ])
    .unwrap();
    let groups = vec![
        vec!["a".to_string(), "b".to_string()],
        vec!["c".to_string()],
    ];
    let tables = split_normalized(&ColumnarEngine, &table, &groups).unwrap();

    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].column_names(), vec!["a", "b"]);
    assert_eq!(
        tables[0].to_values(),
        vec![ints(&[1, 2, 2]), text(&["x", "y", "z"])]
    );
    assert_eq!(tables[1].to_values(), vec![ints(&[7, 8])]);
}

#[test]
fn normalized_groups_may_overlap() {
    let groups = vec![
        vec!["region".to_string(), "country".to_string()],
        vec!["country".to_string()],
    ];
    let tables = split_normalized(&ColumnarEngine, &sales(), &groups).unwrap();
    assert_eq!(tables[0].row_count(), 3);
    assert_eq!(tables[1].row_count(), 3);
}

#[test]
fn normalized_rejects_bad_references() {
    for groups in [
        vec![vec!["nope".to_string()]],
        vec![vec!["region".to_string(), "region".to_string()]],
        vec![Vec::new()],
    ] {
        let err = split_normalized(&ColumnarEngine, &sales(), &groups).unwrap_err();
        assert!(matches!(err, SplitError::InconsistentGrouping(_)), "{groups:?}");
    }
}

#[test]
fn decompose_groups_wide_repetitive_columns() {
    let rows = 200usize;
    let regions = ["north-eastern-region", "south-western-region"];
    let countries = ["kingdom-of-norway", "republic-of-finland"];
    let table = ColumnarTable::new(vec![
        Column::from_values(
            ColumnSchema::new("region", ColumnType::String),
            (0..rows).map(|i| Value::from(regions[i % 2])),
        )
        .unwrap(),
        Column::from_values(
            ColumnSchema::new("country", ColumnType::String),
            (0..rows).map(|i| Value::from(countries[(i / 2) % 2])),
        )
        .unwrap(),
        Column::integers("id", (0..rows as i64).collect()),
    ])
    .unwrap();

    let decomposition = decompose(&ColumnarEngine, table.clone()).unwrap();
    assert_eq!(
        decomposition.plan,
        Plan {
            col_groups: vec![vec![1, 0]],
            fact: vec![2],
        }
    );
    let schema = &decomposition.schema;
    assert_eq!(schema.dims[0].column_names(), vec!["country", "region", "p0"]);
    assert_eq!(schema.dims[0].row_count(), 4);
    assert_eq!(schema.fact.column_names(), vec!["id", "p0"]);
    assert_reassembles(&table, schema);
}

#[test]
fn decompose_rejects_empty_table() {
    let table = ColumnarTable::new(vec![strings("a", &[])]).unwrap();
    let err = decompose(&ColumnarEngine, table).unwrap_err();
    assert!(matches!(err, SplitError::InvalidInput(_)));
}

fn cell(column_type: ColumnType) -> BoxedStrategy<Value> {
    match column_type {
        ColumnType::Float => prop_oneof![
            Just(Value::Null),
            prop::sample::select(vec![0.0, -0.0, 1.5, f64::NAN]).prop_map(Value::Float),
        ]
        .boxed(),
        ColumnType::Integer => prop_oneof![Just(Value::Null), (0i64..3).prop_map(Value::Integer)].boxed(),
        _ => prop_oneof![
            Just(Value::Null),
            prop::sample::select(vec!["x", "y", ""]).prop_map(Value::from),
        ]
        .boxed(),
    }
}

const PLAIN_NAMES: [&str; 3] = ["col0", "col1", "col2"];
/// Names the splitter also uses for its own columns.
const KEY_LIKE_NAMES: [&str; 3] = ["p1", "p0", "key"];

fn arb_table() -> impl Strategy<Value = ColumnarTable> {
    let types = [ColumnType::String, ColumnType::Integer, ColumnType::Float];
    (1usize..30, prop::array::uniform3(any::<bool>())).prop_flat_map(move |(rows, key_like)| {
        types
            .iter()
            .map(|&t| prop::collection::vec(cell(t), rows))
            .collect::<Vec<_>>()
            .prop_map(move |columns| {
                let built = columns
                    .into_iter()
                    .zip(types)
                    .enumerate()
                    .map(|(idx, (values, t))| {
                        let name = if key_like[idx] {
                            KEY_LIKE_NAMES[idx]
                        } else {
                            PLAIN_NAMES[idx]
                        };
                        Column::from_values(ColumnSchema::new(name, t), values).unwrap()
                    })
                    .collect();
                ColumnarTable::new(built).unwrap()
            })
    })
}

/// Assign each of three columns to group 0, group 1 or the fact table.
fn groups_from(assignment: &[Option<usize>]) -> Vec<ColumnGroup> {
    let mut groups: Vec<ColumnGroup> = vec![Vec::new(), Vec::new()];
    for (col, slot) in assignment.iter().enumerate() {
        if let Some(g) = slot {
            groups[*g].push(col);
        }
    }
    groups.retain(|g| !g.is_empty());
    groups
}

proptest! {
    #[test]
    fn split_round_trips_and_dims_are_distinct(
        table in arb_table(),
        assignment in prop::collection::vec(prop::option::of(0usize..2), 3),
    ) {
        let groups = groups_from(&assignment);
        let schema = split(table.clone(), &groups).unwrap();
        prop_assert_eq!(schema.dims.len(), groups.len());

        for dim in &schema.dims {
            let attrs: Vec<usize> = (0..dim.column_count() - 1).collect();
            let rows: Vec<Vec<Value>> = (0..dim.row_count())
                .map(|r| attrs.iter().map(|&c| dim.get_cell(r, c)).collect())
                .collect();
            let unique: HashSet<Vec<Value>> = rows.iter().cloned().collect();
            prop_assert_eq!(unique.len(), rows.len());

            let keys = dim.column(dim.column_count() - 1).unwrap().values();
            prop_assert!(keys.windows(2).all(|w| w[0].as_i64() < w[1].as_i64()));
        }

        assert_keys_resolve(&table, &groups, &schema);

        let joined = reassemble(&ColumnarEngine, &schema).unwrap();
        prop_assert_eq!(joined.column_count(), table.column_count());
        for name in table.column_names() {
            prop_assert_eq!(column_by_name(&joined, &name), column_by_name(&table, &name));
        }
    }
}
