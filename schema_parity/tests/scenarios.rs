//! Reference-vs-target scenarios as they show up in practice: an ORM that
//! forgot a column, a nullability drift, dialect spellings of one type.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use schema_parity::catalog::{Catalog, Column, Constraint, ObjectKind, Schema, Table};
use schema_parity::diff::{diff, DiffOptions, EntryKind, RuleGapPolicy};
use schema_parity::report::{DiffReport, GatePolicy};
use schema_parity::rules::{AttributeDiff, RuleSet};
use schema_parity::Error;

fn catalog(dialect: &str, schema: &str, tables: Vec<Table>) -> Catalog {
    let schema = tables
        .into_iter()
        .fold(Schema::new(schema), |schema, table| schema.with_table(table));
    Catalog::new(dialect, vec![schema]).unwrap()
}

#[test]
fn column_missing_from_orm_model() {
    let reference = catalog(
        "postgres",
        "public",
        vec![Table::new("orders")
            .with_column(Column::new("id", "integer").not_null())
            .with_column(Column::new("total", "decimal"))],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("orders").with_column(Column::new("id", "integer").not_null())],
    );

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    let report = serde_json::to_value(DiffReport::from_result(&result, false)).unwrap();

    assert_eq!(
        report,
        json!({
            "missing": [{ "kind": "column", "identityPath": "orders.total" }],
            "unexpected": [],
            "changed": [],
            "unchanged": []
        })
    );

    let gate = GatePolicy::default().evaluate(&result);
    assert!(!gate.passed);
    assert_eq!(gate.violations, vec!["missing column orders.total".to_string()]);
}

#[test]
fn nullability_drift_is_a_change() {
    let users = |email_nullable: bool| {
        Table::new("users")
            .with_column(Column::new("id", "integer"))
            .with_column(Column::new("email", "text").nullable(email_nullable))
    };
    let reference = catalog("postgres", "public", vec![users(false)]);
    let target = catalog("postgres", "public", vec![users(true)]);

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();

    let changed = result.changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].identity_path.to_string(), "users.email");
    assert_eq!(
        changed[0].attribute_diffs,
        vec![AttributeDiff::new("nullable", false, true)]
    );
    assert!(result.missing().is_empty());
    assert!(result.unexpected().is_empty());
}

#[rstest]
#[case("character varying")]
#[case("CHARACTER VARYING(255)")]
#[case("varchar")]
fn equivalent_type_spellings_are_unchanged(#[case] target_type: &str) {
    let reference = catalog(
        "postgres",
        "public",
        vec![Table::new("users").with_column(Column::new("name", "varchar(255)"))],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("users").with_column(Column::new("name", target_type))],
    );

    let options = DiffOptions::default().type_alias("character varying", "varchar");
    let result = diff(&reference, &target, &options).unwrap();

    assert!(result.changed().is_empty());
    let entry = result.find(ObjectKind::Column, "users.name").unwrap();
    assert_eq!(entry.entry_kind, EntryKind::Unchanged);
}

#[test]
fn registered_equivalence_resolves_unknown_types() {
    let reference = catalog(
        "postgres",
        "public",
        vec![Table::new("places").with_column(Column::new("shape", "geometry"))],
    );
    let target = catalog(
        "h2",
        "PUBLIC",
        vec![Table::new("PLACES").with_column(Column::new("SHAPE", "GEOGRAPHY"))],
    );

    let err = diff(&reference, &target, &DiffOptions::default()).unwrap_err();
    assert!(matches!(err, Error::EquivalenceRuleGap { ref key, .. } if key == "places.shape"));

    let options = DiffOptions::default().type_alias("geography", "geometry");
    let result = diff(&reference, &target, &options).unwrap();
    assert!(result.is_empty());
}

#[test]
fn h2_and_postgres_catalogs_compare_by_folded_names() {
    let reference = catalog(
        "h2",
        "PUBLIC",
        vec![Table::new("ORDERS")
            .with_column(Column::new("ID", "INTEGER").not_null())
            .with_column(Column::new("CREATED", "TIMESTAMP").default("CURRENT_TIMESTAMP"))
            .with_constraint(Constraint::primary_key(Some("CONSTRAINT_8"), &["ID"]))],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("orders")
            .with_column(Column::new("id", "int4").not_null())
            .with_column(
                Column::new("created", "timestamp without time zone").default("CURRENT_TIMESTAMP"),
            )
            .with_constraint(Constraint::primary_key(Some("orders_pkey"), &["id"]))],
    );

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    assert!(result.is_empty(), "{:?}", result.entries());
}

#[rstest]
#[case::fail(RuleGapPolicy::Fail)]
#[case::degrade(RuleGapPolicy::Degrade)]
fn rule_gaps_follow_the_policy(#[case] policy: RuleGapPolicy) {
    let orders = Table::new("orders").with_column(Column::new("id", "integer"));
    let reference = catalog("postgres", "public", vec![orders.clone()]);
    let target = catalog("postgres", "public", vec![orders]);

    let mut options = DiffOptions::default().rule_gap_policy(policy);
    options.rules = RuleSet::default().without(ObjectKind::Column);

    match (policy, diff(&reference, &target, &options)) {
        (RuleGapPolicy::Fail, Err(Error::EquivalenceRuleGap { key, .. })) => {
            assert_eq!(key, "orders.id");
        }
        (RuleGapPolicy::Degrade, Ok(result)) => {
            let changed = result.changed();
            assert_eq!(changed.len(), 1);
            assert_eq!(changed[0].attribute_diffs[0].attribute, "unknown:column");
        }
        (policy, outcome) => panic!("unexpected outcome under {:?}: {:?}", policy, outcome),
    }
}

#[test]
fn generated_constraint_names_do_not_count() {
    let reference = catalog(
        "postgres",
        "public",
        vec![Table::new("users")
            .with_column(Column::new("email", "text"))
            .with_constraint(Constraint::unique(Some("UK6dotkott2kjsp8vw4d0m25fb7"), &["email"]))],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("users")
            .with_column(Column::new("email", "text"))
            .with_constraint(Constraint::unique(Some("users_email_key"), &["email"]))],
    );

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.entries_for_object(ObjectKind::Constraint).count(), 1);
}

#[test]
fn differently_named_significant_constraints_do_not_pair() {
    let table = |name: &str| {
        Table::new("users")
            .with_column(Column::new("email", "text"))
            .with_constraint(Constraint::unique(Some(name), &["email"]))
    };
    let reference = catalog("postgres", "public", vec![table("uq_users_email")]);
    let target = catalog("postgres", "public", vec![table("users_email_unique")]);

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    assert_eq!(result.missing().len(), 1);
    assert_eq!(result.unexpected().len(), 1);
}

#[test]
fn quoted_names_in_the_stored_case_match_unquoted_ones() {
    let reference = catalog(
        "h2",
        "\"PUBLIC\"",
        vec![Table::new("\"ORDERS\"").with_column(Column::new("\"ID\"", "INTEGER").not_null())],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("orders").with_column(Column::new("id", "integer").not_null())],
    );

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    assert!(result.is_empty(), "{:?}", result.entries());
}

#[test]
fn quoted_lower_case_h2_table_is_its_own_object() {
    let reference = catalog(
        "h2",
        "PUBLIC",
        vec![
            Table::new("\"orders\"").with_column(Column::new("ID", "INTEGER")),
            Table::new("ORDERS").with_column(Column::new("ID", "INTEGER")),
        ],
    );
    let target = catalog(
        "postgres",
        "public",
        vec![Table::new("orders").with_column(Column::new("id", "integer"))],
    );

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();

    let missing: Vec<String> = result
        .missing()
        .iter()
        .map(|e| e.identity_path.to_string())
        .collect();
    assert_eq!(missing, vec!["\"orders\"".to_string()]);
    assert!(result.unexpected().is_empty());
    assert_eq!(
        result.find(ObjectKind::Table, "orders").map(|e| e.entry_kind),
        Some(EntryKind::Unchanged)
    );
}

#[rstest]
#[case::text_keeps_leading_zeros("varchar(10)", "'007'", "'7'", 1)]
#[case::text_quoted_versus_bare("varchar(10)", "'0'", "0", 1)]
#[case::integer_quoted_versus_bare("integer", "0", "'0'", 0)]
#[case::decimal_by_value("numeric(10,2)", "10.50", "'10.5'", 0)]
fn defaults_compare_by_column_type(
    #[case] data_type: &str,
    #[case] reference_default: &str,
    #[case] target_default: &str,
    #[case] changed: usize,
) {
    let table = |default: &str| {
        Table::new("codes").with_column(Column::new("code", data_type).default(default))
    };
    let reference = catalog("postgres", "public", vec![table(reference_default)]);
    let target = catalog("postgres", "public", vec![table(target_default)]);

    let result = diff(&reference, &target, &DiffOptions::default()).unwrap();
    assert_eq!(result.changed().len(), changed);
}
