//! Properties every comparison must hold, checked on realistic catalogs.

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use schema_parity::catalog::{
    Catalog, Column, Constraint, Index, ObjectKind, Schema, Sequence, Table, TableRef, View,
};
use schema_parity::diff::{diff, DiffEntry, DiffOptions, DiffResult, EntryKind};
use schema_parity::report::DiffReport;
use schema_parity::rules::AttributeDiff;

fn users() -> Table {
    Table::new("users")
        .with_column(Column::new("id", "bigint").not_null().position(1))
        .with_column(Column::new("email", "varchar(255)").not_null().position(2))
        .with_column(Column::new("created_at", "timestamp").default("now()").position(3))
        .with_constraint(Constraint::primary_key(Some("users_pkey"), &["id"]))
        .with_constraint(Constraint::unique(Some("users_email_key"), &["email"]))
}

fn orders() -> Table {
    Table::new("orders")
        .with_column(Column::new("id", "bigint").not_null().position(1))
        .with_column(Column::new("user_id", "bigint").not_null().position(2))
        .with_column(Column::new("total", "numeric(10,2)").position(3))
        .with_constraint(Constraint::primary_key(Some("orders_pkey"), &["id"]))
        .with_constraint(Constraint::foreign_key(
            Some("fk_orders_user"),
            &["user_id"],
            TableRef::new(None, "users"),
            &["id"],
        ))
        .with_index(Index::new(Some("idx_orders_user"), &["user_id"]))
}

#[fixture]
fn reference() -> Catalog {
    let mut schema = Schema::new("public").with_table(users()).with_table(orders());
    schema.add_view(View::new("active_users", "select id from users"));
    schema.add_sequence(Sequence::new("invoice_seq"));
    Catalog::new("postgres", vec![schema]).unwrap()
}

/// Differs from the reference in every possible way
#[fixture]
fn target() -> Catalog {
    let mut users = users();
    users.columns[1].nullable = true;
    users.columns.push(Column::new("nickname", "text").position(4));

    let mut orders = orders();
    orders.columns.retain(|c| c.name != "total");
    orders.indexes.clear();

    let mut schema = Schema::new("public").with_table(users).with_table(orders);
    schema.add_table(Table::new("audit_log").with_column(Column::new("id", "bigint").not_null()));
    schema.add_sequence(Sequence::new("invoice_seq"));
    Catalog::new("postgres", vec![schema]).unwrap()
}

fn swap_entry(entry: &DiffEntry) -> DiffEntry {
    let entry_kind = match entry.entry_kind {
        EntryKind::Missing => EntryKind::Unexpected,
        EntryKind::Unexpected => EntryKind::Missing,
        other => other,
    };
    DiffEntry {
        entry_kind,
        object_kind: entry.object_kind,
        identity_path: entry.identity_path.clone(),
        attribute_diffs: entry
            .attribute_diffs
            .iter()
            .map(|d| AttributeDiff {
                attribute: d.attribute.clone(),
                reference: d.target.clone(),
                target: d.reference.clone(),
            })
            .collect(),
    }
}

#[rstest]
#[case::reference(reference())]
#[case::target(target())]
fn a_catalog_equals_itself(#[case] catalog: Catalog) {
    let result = diff(&catalog, &catalog, &DiffOptions::default()).unwrap();

    assert!(result.is_empty());
    assert_eq!(result.unchanged().len(), result.entries().len());
}

#[rstest]
fn swapping_sides_swaps_the_result(reference: Catalog, target: Catalog) {
    let options = DiffOptions::default();
    let forward = diff(&reference, &target, &options).unwrap();
    let backward = diff(&target, &reference, &options.swapped()).unwrap();

    let swapped = DiffResult::new(forward.entries().iter().map(swap_entry).collect());
    assert_eq!(backward, swapped);
    assert_eq!(forward.missing().len(), backward.unexpected().len());
}

/// A single table `t(a)` carrying the given indexes on `a`, in order
fn indexed(names: &[Option<&str>]) -> Catalog {
    let table = names.iter().fold(
        Table::new("t").with_column(Column::new("a", "integer")),
        |table, name| table.with_index(Index::new(*name, &["a"])),
    );
    Catalog::new("postgres", vec![Schema::new("public").with_table(table)]).unwrap()
}

#[rstest]
#[case::realistic(reference(), target())]
#[case::named_and_unnamed_indexes(indexed(&[None]), indexed(&[Some("ix_a"), None]))]
#[case::unnamed_indexes_only(indexed(&[None]), indexed(&[None, None]))]
fn input_order_does_not_matter(#[case] reference: Catalog, #[case] target: Catalog) {
    let shuffle = |catalog: &Catalog| {
        let schemas = catalog
            .schemas()
            .iter()
            .cloned()
            .map(|mut schema| {
                schema.tables.reverse();
                for table in &mut schema.tables {
                    table.columns.reverse();
                    table.constraints.reverse();
                    table.indexes.reverse();
                }
                schema
            })
            .collect();
        Catalog::new("postgres", schemas).unwrap()
    };

    let options = DiffOptions::default();
    let first = diff(&reference, &target, &options).unwrap();
    let second = diff(&shuffle(&reference), &shuffle(&target), &options).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        DiffReport::from_result(&first, true).to_json().unwrap(),
        DiffReport::from_result(&second, true).to_json().unwrap()
    );
}

#[rstest]
#[case::named_first(&[Some("ix_a"), None])]
#[case::unnamed_first(&[None, Some("ix_a")])]
fn unnamed_indexes_pair_before_named_ones(#[case] target_indexes: &[Option<&str>]) {
    let result =
        diff(&indexed(&[None]), &indexed(target_indexes), &DiffOptions::default()).unwrap();

    let unexpected: Vec<String> = result
        .unexpected()
        .iter()
        .map(|e| e.identity_path.to_string())
        .collect();
    assert_eq!(unexpected, vec!["t.ix_a".to_string()]);
    assert!(result.missing().is_empty());
    assert_eq!(
        result.find(ObjectKind::Index, "t.index(a)").map(|e| e.entry_kind),
        Some(EntryKind::Unchanged)
    );
}

#[rstest]
fn every_kind_of_difference_is_found(reference: Catalog, target: Catalog) {
    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();

    let summary: Vec<(EntryKind, String)> = result
        .entries()
        .iter()
        .filter(|e| e.entry_kind != EntryKind::Unchanged)
        .map(|e| (e.entry_kind, format!("{} {}", e.object_kind, e.identity_path)))
        .collect();

    assert_eq!(
        summary,
        vec![
            (EntryKind::Missing, "view active_users".to_string()),
            (EntryKind::Unexpected, "table audit_log".to_string()),
            (EntryKind::Missing, "index orders.idx_orders_user".to_string()),
            (EntryKind::Missing, "column orders.total".to_string()),
            (EntryKind::Changed, "column users.email".to_string()),
            (EntryKind::Unexpected, "column users.nickname".to_string()),
        ]
    );
}

#[rstest]
fn children_of_unmatched_objects_are_not_listed(reference: Catalog, target: Catalog) {
    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();

    assert!(result
        .entries()
        .iter()
        .all(|e| e.identity_path.segments().first().map(String::as_str) != Some("audit_log")
            || e.identity_path.segments().len() == 1));
}

#[rstest]
fn each_added_column_adds_one_entry(reference: Catalog) {
    let baseline = diff(&reference, &reference, &DiffOptions::default()).unwrap();

    let mut schemas = reference.schemas().to_vec();
    for (i, name) in ["notes", "tags", "score"].iter().enumerate() {
        schemas[0].tables[0].add_column(Column::new(name, "text"));
        let target = Catalog::new("postgres", schemas.clone()).unwrap();
        let result = diff(&reference, &target, &DiffOptions::default()).unwrap();

        assert_eq!(result.unexpected().len(), i + 1);
        assert_eq!(result.missing().len(), 0);
        assert_eq!(result.changed().len(), 0);
        assert_eq!(result.unchanged().len(), baseline.unchanged().len());
    }
}

#[rstest]
fn an_added_table_leaves_other_entries_alone(reference: Catalog, target: Catalog) {
    let before = diff(&reference, &target, &DiffOptions::default()).unwrap();

    let mut schemas = target.schemas().to_vec();
    schemas[0].add_table(
        Table::new("shipments")
            .with_column(Column::new("id", "bigint").not_null())
            .with_column(Column::new("order_id", "bigint")),
    );
    let grown = Catalog::new("postgres", schemas).unwrap();
    let after = diff(&reference, &grown, &DiffOptions::default()).unwrap();

    let added: Vec<&DiffEntry> = after
        .entries()
        .iter()
        .filter(|e| !before.entries().contains(e))
        .collect();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].entry_kind, EntryKind::Unexpected);
    assert_eq!(added[0].identity_path.to_string(), "shipments");
    assert_eq!(after.entries().len(), before.entries().len() + 1);
}

#[rstest]
fn excluded_tables_are_invisible(reference: Catalog, target: Catalog) {
    let options = DiffOptions::default().exclude_table("AUDIT_*");
    let result = diff(&reference, &target, &options).unwrap();

    assert!(result.unexpected().iter().all(|e| e.identity_path.to_string() != "audit_log"));
}
