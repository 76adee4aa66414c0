//! The validated catalog
//!
//! A [`Catalog`] is the root of a strict ownership tree
//! (schema → table → column / index / constraint). It is validated and
//! indexed once at construction and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::catalog::types::{ConstraintKind, Schema, Table};
use crate::error::{Error, Result};
use crate::rules::dialect::Dialect;
use crate::rules::identity::{constraint_signature, identity_key, index_signature, schema_key};

/// A non-fatal observation made while building a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogWarning {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Table(usize, usize),
    View(usize, usize),
}

type SchemaKey = Option<String>;

/// A full structural snapshot of one database
#[derive(Debug, Clone)]
pub struct Catalog {
    dialect: Dialect,
    schemas: Vec<Schema>,
    warnings: Vec<CatalogWarning>,
    schema_index: HashMap<SchemaKey, usize>,
    relation_index: HashMap<(SchemaKey, String), Relation>,
    sequence_index: HashMap<(SchemaKey, String), (usize, usize)>,
    column_index: HashMap<(SchemaKey, String, String), usize>,
}

/// Two catalogs are equal when they hold the same dialect and schemas
impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.dialect == other.dialect && self.schemas == other.schemas
    }
}

impl Catalog {
    /// Build a catalog for a built-in dialect tag (`postgres`, `h2`, ...)
    pub fn new(dialect_tag: &str, schemas: Vec<Schema>) -> Result<Self> {
        Self::with_dialect(Dialect::builtin(dialect_tag), schemas)
    }

    /// Validate and index the given schemas.
    ///
    /// Duplicate identity keys and dangling references inside the snapshot
    /// are [`Error::MalformedCatalog`]. A foreign key to a table outside the
    /// snapshot is only recorded as a warning.
    pub fn with_dialect(dialect: Dialect, schemas: Vec<Schema>) -> Result<Self> {
        let mut catalog = Self {
            dialect,
            schemas,
            warnings: Vec::new(),
            schema_index: HashMap::new(),
            relation_index: HashMap::new(),
            sequence_index: HashMap::new(),
            column_index: HashMap::new(),
        };

        catalog.normalize()?;
        catalog.index()?;
        catalog.check_references()?;

        for warning in &catalog.warnings {
            tracing::warn!(key = %warning.key, "{}", warning.message);
        }
        tracing::debug!(
            dialect = %catalog.dialect.name,
            schemas = catalog.schemas.len(),
            relations = catalog.relation_index.len(),
            "Catalog built"
        );

        Ok(catalog)
    }

    /// Fill in implied values: ordinal positions and same-schema references.
    ///
    /// Two columns of one table declaring the same position are malformed.
    fn normalize(&mut self) -> Result<()> {
        for schema in &mut self.schemas {
            let schema_name = schema.name.clone();
            for table in &mut schema.tables {
                let mut positions = HashSet::new();
                for column in table.columns.iter().filter(|c| c.ordinal_position != 0) {
                    if !positions.insert(column.ordinal_position) {
                        return Err(Error::malformed(
                            format!("{}.{}.{}", schema_name, table.name, column.name),
                            format!("duplicate ordinal position {}", column.ordinal_position),
                        ));
                    }
                }
                for (i, column) in table.columns.iter_mut().enumerate() {
                    if column.ordinal_position == 0 {
                        column.ordinal_position = i as u32 + 1;
                    }
                }
                for constraint in &mut table.constraints {
                    if let ConstraintKind::ForeignKey { references, .. } = &mut constraint.kind {
                        if references.schema.is_none() {
                            references.schema = Some(schema_name.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn index(&mut self) -> Result<()> {
        let dialect = &self.dialect;

        for (si, schema) in self.schemas.iter().enumerate() {
            let skey = schema_key(&schema.name, dialect);
            if self.schema_index.insert(skey.clone(), si).is_some() {
                return Err(Error::malformed(&schema.name, "duplicate schema"));
            }

            for (ti, table) in schema.tables.iter().enumerate() {
                let path = format!("{}.{}", schema.name, table.name);
                let tkey = identity_key(&table.name, dialect);
                if self
                    .relation_index
                    .insert((skey.clone(), tkey.clone()), Relation::Table(si, ti))
                    .is_some()
                {
                    return Err(Error::malformed(path, "duplicate table or view"));
                }

                let mut columns = HashSet::new();
                for (ci, column) in table.columns.iter().enumerate() {
                    let ckey = identity_key(&column.name, dialect);
                    if !columns.insert(ckey.clone()) {
                        return Err(Error::malformed(
                            format!("{}.{}", path, column.name),
                            "duplicate column",
                        ));
                    }
                    self.column_index.insert((skey.clone(), tkey.clone(), ckey), ci);
                }

                validate_table(&path, table, &columns, dialect)?;
            }

            for (vi, view) in schema.views.iter().enumerate() {
                let path = format!("{}.{}", schema.name, view.name);
                let vkey = identity_key(&view.name, dialect);
                if self
                    .relation_index
                    .insert((skey.clone(), vkey), Relation::View(si, vi))
                    .is_some()
                {
                    return Err(Error::malformed(path, "duplicate table or view"));
                }

                let mut columns = HashSet::new();
                for column in &view.columns {
                    if !columns.insert(identity_key(column, dialect)) {
                        return Err(Error::malformed(
                            format!("{}.{}", path, column),
                            "duplicate view column",
                        ));
                    }
                }
            }

            for (qi, sequence) in schema.sequences.iter().enumerate() {
                let qkey = identity_key(&sequence.name, dialect);
                if self
                    .sequence_index
                    .insert((skey.clone(), qkey), (si, qi))
                    .is_some()
                {
                    return Err(Error::malformed(
                        format!("{}.{}", schema.name, sequence.name),
                        "duplicate sequence",
                    ));
                }
            }
        }

        Ok(())
    }

    fn check_references(&mut self) -> Result<()> {
        let mut warnings = Vec::new();

        for schema in &self.schemas {
            for table in &schema.tables {
                for constraint in &table.constraints {
                    let ConstraintKind::ForeignKey {
                        references,
                        referenced_columns,
                        ..
                    } = &constraint.kind
                    else {
                        continue;
                    };

                    let path = format!(
                        "{}.{}.{}",
                        schema.name,
                        table.name,
                        constraint.name.as_deref().unwrap_or("foreign key")
                    );

                    if !referenced_columns.is_empty()
                        && referenced_columns.len() != constraint.columns.len()
                    {
                        return Err(Error::malformed(
                            path,
                            "foreign key column count differs from referenced column count",
                        ));
                    }

                    let target_schema = references
                        .schema
                        .as_deref()
                        .map_or_else(|| schema_key(&schema.name, &self.dialect), |s| {
                            schema_key(s, &self.dialect)
                        });
                    let target_table = identity_key(&references.table, &self.dialect);

                    match self.relation_index.get(&(target_schema.clone(), target_table.clone())) {
                        Some(Relation::Table(_, _)) => {
                            for column in referenced_columns {
                                let key = (
                                    target_schema.clone(),
                                    target_table.clone(),
                                    identity_key(column, &self.dialect),
                                );
                                if !self.column_index.contains_key(&key) {
                                    return Err(Error::malformed(
                                        path,
                                        format!(
                                            "foreign key references missing column {}.{}",
                                            references, column
                                        ),
                                    ));
                                }
                            }
                        }
                        Some(Relation::View(_, _)) => {
                            return Err(Error::malformed(
                                path,
                                format!("foreign key references view {}", references),
                            ));
                        }
                        None => warnings.push(CatalogWarning {
                            key: path,
                            message: format!(
                                "foreign key references {} which is not part of this snapshot",
                                references
                            ),
                        }),
                    }
                }
            }
        }

        self.warnings = warnings;
        Ok(())
    }

    /// The tag of the dialect this catalog was captured from
    pub fn dialect_tag(&self) -> &str {
        &self.dialect.name
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Schemas in declaration order
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn warnings(&self) -> &[CatalogWarning] {
        &self.warnings
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schema_index
            .get(&schema_key(name, &self.dialect))
            .map(|&si| &self.schemas[si])
    }

    /// Look up a table; `None` for the schema means the default schema
    pub fn table(&self, schema: Option<&str>, name: &str) -> Option<&Table> {
        match self.relation(schema, name)? {
            Relation::Table(si, ti) => Some(&self.schemas[si].tables[ti]),
            Relation::View(_, _) => None,
        }
    }

    pub fn view(&self, schema: Option<&str>, name: &str) -> Option<&crate::catalog::types::View> {
        match self.relation(schema, name)? {
            Relation::View(si, vi) => Some(&self.schemas[si].views[vi]),
            Relation::Table(_, _) => None,
        }
    }

    pub fn sequence(
        &self,
        schema: Option<&str>,
        name: &str,
    ) -> Option<&crate::catalog::types::Sequence> {
        let key = (self.schema_lookup_key(schema), identity_key(name, &self.dialect));
        self.sequence_index
            .get(&key)
            .map(|&(si, qi)| &self.schemas[si].sequences[qi])
    }

    pub fn column(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Option<&crate::catalog::types::Column> {
        let schema_key = self.schema_lookup_key(schema);
        let table_key = identity_key(table, &self.dialect);
        let ci = *self.column_index.get(&(
            schema_key.clone(),
            table_key.clone(),
            identity_key(column, &self.dialect),
        ))?;
        match self.relation_index.get(&(schema_key, table_key))? {
            Relation::Table(si, ti) => Some(&self.schemas[*si].tables[*ti].columns[ci]),
            Relation::View(_, _) => None,
        }
    }

    /// Every table with its owning schema, in declaration order
    pub fn tables(&self) -> impl Iterator<Item = (&Schema, &Table)> {
        self.schemas
            .iter()
            .flat_map(|schema| schema.tables.iter().map(move |table| (schema, table)))
    }

    fn schema_lookup_key(&self, schema: Option<&str>) -> SchemaKey {
        schema.and_then(|s| schema_key(s, &self.dialect))
    }

    fn relation(&self, schema: Option<&str>, name: &str) -> Option<Relation> {
        self.relation_index
            .get(&(self.schema_lookup_key(schema), identity_key(name, &self.dialect)))
            .copied()
    }
}

fn validate_table(
    path: &str,
    table: &Table,
    columns: &HashSet<String>,
    dialect: &Dialect,
) -> Result<()> {
    let known = |column: &String| columns.contains(&identity_key(column, dialect));

    let mut index_names = HashSet::new();
    let mut index_signatures = HashSet::new();
    for index in &table.indexes {
        let label = index.name.clone().unwrap_or_else(|| index_signature(index, dialect));
        let index_path = format!("{}.{}", path, label);
        if index.columns.is_empty() {
            return Err(Error::malformed(index_path, "index without columns"));
        }
        if let Some(missing) = index.columns.iter().find(|c| !known(c)) {
            return Err(Error::malformed(
                index_path,
                format!("index references unknown column '{}'", missing),
            ));
        }
        let unique_identity = match &index.name {
            Some(name) => index_names.insert(identity_key(name, dialect)),
            None => index_signatures.insert(index_signature(index, dialect)),
        };
        if !unique_identity {
            return Err(Error::malformed(index_path, "duplicate index"));
        }
    }

    let mut constraint_names = HashSet::new();
    let mut constraint_signatures = HashSet::new();
    let mut primary_keys = 0;
    for constraint in &table.constraints {
        let label = constraint
            .name
            .clone()
            .unwrap_or_else(|| constraint_signature(constraint, dialect));
        let constraint_path = format!("{}.{}", path, label);

        if matches!(constraint.kind, ConstraintKind::PrimaryKey) {
            primary_keys += 1;
            if primary_keys > 1 {
                return Err(Error::malformed(constraint_path, "more than one primary key"));
            }
        }
        let needs_columns = !matches!(constraint.kind, ConstraintKind::Check { .. });
        if needs_columns && constraint.columns.is_empty() {
            return Err(Error::malformed(constraint_path, "constraint without columns"));
        }
        if let Some(missing) = constraint.columns.iter().find(|c| !known(c)) {
            return Err(Error::malformed(
                constraint_path,
                format!("constraint references unknown column '{}'", missing),
            ));
        }
        let unique_identity = match &constraint.name {
            Some(name) => constraint_names.insert(identity_key(name, dialect)),
            None => constraint_signatures.insert(constraint_signature(constraint, dialect)),
        };
        if !unique_identity {
            return Err(Error::malformed(constraint_path, "duplicate constraint"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Column, Constraint, Index, TableRef, View};

    fn orders() -> Table {
        Table::new("orders")
            .with_column(Column::new("id", "integer").not_null())
            .with_column(Column::new("user_id", "integer"))
            .with_constraint(Constraint::primary_key(None, &["id"]))
    }

    #[test]
    fn lookups_are_case_folded() {
        let catalog = Catalog::new("h2", vec![Schema::new("PUBLIC").with_table(orders())]).unwrap();
        assert!(catalog.table(None, "ORDERS").is_some());
        assert!(catalog.table(Some("public"), "orders").is_some());
        assert_eq!(
            catalog.column(None, "orders", "USER_ID").map(|c| c.ordinal_position),
            Some(2)
        );
        assert!(catalog.schema("public").is_some());
    }

    #[test]
    fn duplicate_columns_are_malformed() {
        let table = orders().with_column(Column::new("ID", "bigint"));
        let err = Catalog::new("postgres", vec![Schema::new("public").with_table(table)])
            .unwrap_err();
        match err {
            Error::MalformedCatalog { key, .. } => assert_eq!(key, "public.orders.ID"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_ordinal_positions_are_malformed() {
        let table = Table::new("orders")
            .with_column(Column::new("id", "integer").position(1))
            .with_column(Column::new("total", "decimal").position(2))
            .with_column(Column::new("status", "text").position(2));
        let err = Catalog::new("postgres", vec![Schema::new("public").with_table(table)])
            .unwrap_err();
        match err {
            Error::MalformedCatalog { key, reason } => {
                assert_eq!(key, "public.orders.status");
                assert_eq!(reason, "duplicate ordinal position 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_ordinal_positions_follow_declaration_order() {
        let catalog = Catalog::new("postgres", vec![Schema::new("public").with_table(orders())])
            .unwrap();
        let positions: Vec<u32> = catalog
            .table(None, "orders")
            .map(|t| t.columns.iter().map(|c| c.ordinal_position).collect())
            .unwrap_or_default();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn tables_and_views_share_a_namespace() {
        let mut schema = Schema::new("public").with_table(orders());
        schema.add_view(View::new("ORDERS", "select 1"));
        assert!(matches!(
            Catalog::new("postgres", vec![schema]),
            Err(Error::MalformedCatalog { .. })
        ));
    }

    #[test]
    fn index_on_unknown_column_is_malformed() {
        let table = orders().with_index(Index::new(Some("ix_orders_total"), &["total"]));
        assert!(matches!(
            Catalog::new("postgres", vec![Schema::new("public").with_table(table)]),
            Err(Error::MalformedCatalog { .. })
        ));
    }

    #[test]
    fn foreign_key_outside_snapshot_is_a_warning() {
        let table = orders().with_constraint(Constraint::foreign_key(
            Some("fk_orders_user"),
            &["user_id"],
            TableRef::new(Some("auth"), "users"),
            &["id"],
        ));
        let catalog =
            Catalog::new("postgres", vec![Schema::new("public").with_table(table)]).unwrap();
        assert_eq!(catalog.warnings().len(), 1);
        assert_eq!(catalog.warnings()[0].key, "public.orders.fk_orders_user");
    }

    #[test]
    fn foreign_key_to_missing_column_is_malformed() {
        let users = Table::new("users").with_column(Column::new("id", "integer"));
        let table = orders().with_constraint(Constraint::foreign_key(
            None,
            &["user_id"],
            TableRef::new(None, "users"),
            &["uuid"],
        ));
        let schema = Schema::new("public").with_table(users).with_table(table);
        assert!(matches!(
            Catalog::new("postgres", vec![schema]),
            Err(Error::MalformedCatalog { .. })
        ));
    }
}
