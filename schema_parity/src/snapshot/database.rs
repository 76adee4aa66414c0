//! Live database snapshotter
//!
//! Introspects PostgreSQL, MySQL and SQLite catalogs over `sqlx`. Every
//! driver answers the same two questions (which schemas exist, and what is
//! in one schema) through the [`Introspector`] trait.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};

use crate::catalog::types::{
    Column, Constraint, ConstraintKind, Index, Schema, Sequence, Table, TableRef, View,
};
use crate::catalog::Catalog;
use crate::config::DatabaseConfig;
use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::snapshot::Snapshotter;

/// Driver-specific catalog introspection
#[async_trait]
trait Introspector: Send + Sync {
    /// Non-system schemas, sorted
    async fn schema_names(&self) -> Result<Vec<String>>;

    /// Everything in one schema
    async fn introspect_schema(&self, schema: &str) -> Result<Schema>;
}

/// Snapshots a live database
#[derive(Debug, Clone)]
pub struct DatabaseSnapshotter {
    config: DatabaseConfig,
}

impl DatabaseSnapshotter {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    async fn introspect(&self, connection: &DatabaseConnection) -> Result<Vec<Schema>> {
        match connection {
            DatabaseConnection::Postgres(pool) => {
                introspect_all(&PostgresIntrospector { pool }, &self.config.schemas).await
            }
            DatabaseConnection::MySql(pool) => {
                introspect_all(&MySqlIntrospector { pool }, &self.config.schemas).await
            }
            DatabaseConnection::Sqlite(pool) => {
                introspect_all(&SqliteIntrospector { pool }, &self.config.schemas).await
            }
        }
    }
}

#[async_trait]
impl Snapshotter for DatabaseSnapshotter {
    fn source_name(&self) -> String {
        format!("{} database", self.config.driver)
    }

    async fn snapshot(&self) -> Result<Catalog> {
        let connection = DatabaseConnection::connect(&self.config).await?;
        let schemas = self.introspect(&connection).await;
        connection.close().await;

        Catalog::with_dialect(self.config.dialect(), schemas?)
    }
}

async fn introspect_all(introspector: &dyn Introspector, requested: &[String]) -> Result<Vec<Schema>> {
    let available = introspector.schema_names().await?;

    let selected: Vec<&String> = if requested.is_empty() {
        available.iter().collect()
    } else {
        for name in requested {
            if !available.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                tracing::warn!(schema = %name, "Requested schema does not exist");
            }
        }
        available
            .iter()
            .filter(|a| requested.iter().any(|r| r.eq_ignore_ascii_case(a)))
            .collect()
    };

    let mut schemas = Vec::with_capacity(selected.len());
    for name in selected {
        let schema = introspector.introspect_schema(name).await?;
        tracing::debug!(
            schema = %name,
            tables = schema.tables.len(),
            views = schema.views.len(),
            sequences = schema.sequences.len(),
            "Introspected schema"
        );
        schemas.push(schema);
    }
    Ok(schemas)
}

/// Referential action spelled the way information_schema spells it
fn referential_action(code: &str) -> Option<String> {
    let action = match code.trim() {
        "a" => "NO ACTION",
        "r" => "RESTRICT",
        "c" => "CASCADE",
        "n" => "SET NULL",
        "d" => "SET DEFAULT",
        _ => return None,
    };
    Some(action.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Row types for PostgreSQL queries
#[derive(FromRow)]
struct PgTableRow {
    table_name: String,
    comment: Option<String>,
}

#[derive(FromRow)]
struct PgColumnRow {
    column_name: String,
    data_type: String,
    nullable: bool,
    column_default: Option<String>,
    ordinal_position: i64,
    is_identity: bool,
    comment: Option<String>,
}

#[derive(FromRow)]
struct PgConstraintRow {
    constraint_name: String,
    constraint_type: String,
    columns: Vec<String>,
    ref_schema: Option<String>,
    ref_table: Option<String>,
    ref_columns: Vec<String>,
    on_delete: String,
    on_update: String,
    definition: String,
}

#[derive(FromRow)]
struct PgIndexRow {
    index_name: String,
    columns: Vec<String>,
    is_unique: bool,
    index_method: String,
}

#[derive(FromRow)]
struct PgViewRow {
    view_name: String,
    definition: Option<String>,
    columns: Vec<String>,
}

#[derive(FromRow)]
struct PgSequenceRow {
    sequence_name: String,
    start_value: Option<i64>,
    increment: Option<i64>,
    min_value: Option<i64>,
    max_value: Option<i64>,
    cycle: bool,
}

/// PostgreSQL catalog introspection
struct PostgresIntrospector<'a> {
    pool: &'a Pool<Postgres>,
}

impl<'a> PostgresIntrospector<'a> {
    /// PostgreSQL folds unquoted names to lower case, so a stored name with
    /// upper case letters was created quoted
    fn ident(name: &str) -> String {
        if name.chars().any(char::is_uppercase) {
            format!("\"{}\"", name)
        } else {
            name.to_string()
        }
    }

    fn idents(names: &[String]) -> Vec<String> {
        names.iter().map(|n| Self::ident(n)).collect()
    }

    async fn table(&self, schema: &str, row: PgTableRow) -> Result<Table> {
        let mut table = Table::new(&Self::ident(&row.table_name));
        table.comment = non_empty(row.comment);

        let sql = r#"
            SELECT
                a.attname::text AS column_name,
                pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                NOT a.attnotnull AS nullable,
                pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default,
                row_number() OVER (ORDER BY a.attnum) AS ordinal_position,
                a.attidentity <> '' AS is_identity,
                pg_catalog.col_description(a.attrelid, a.attnum) AS comment
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let column_rows = sqlx::query_as::<_, PgColumnRow>(sql)
            .bind(schema)
            .bind(&row.table_name)
            .fetch_all(self.pool)
            .await?;

        for col in column_rows {
            // serial columns show up as a nextval() default
            let serial = col
                .column_default
                .as_deref()
                .map_or(false, |d| d.starts_with("nextval("));

            table.add_column(Column {
                name: Self::ident(&col.column_name),
                data_type: col.data_type,
                nullable: col.nullable,
                default: if serial { None } else { col.column_default },
                ordinal_position: u32::try_from(col.ordinal_position).unwrap_or(0),
                auto_increment: serial || col.is_identity,
                comment: non_empty(col.comment),
            });
        }

        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                con.contype::text AS constraint_type,
                ARRAY(
                    SELECT att.attname::text
                    FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_catalog.pg_attribute att
                        ON att.attrelid = con.conrelid AND att.attnum = k.attnum
                    ORDER BY k.ord
                ) AS columns,
                rn.nspname::text AS ref_schema,
                rc.relname::text AS ref_table,
                ARRAY(
                    SELECT att.attname::text
                    FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_catalog.pg_attribute att
                        ON att.attrelid = con.confrelid AND att.attnum = k.attnum
                    ORDER BY k.ord
                ) AS ref_columns,
                con.confdeltype::text AS on_delete,
                con.confupdtype::text AS on_update,
                pg_catalog.pg_get_constraintdef(con.oid) AS definition
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid
            LEFT JOIN pg_catalog.pg_namespace rn ON rn.oid = rc.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2 AND con.contype IN ('p', 'u', 'f', 'c')
            ORDER BY con.conname
        "#;

        let constraint_rows = sqlx::query_as::<_, PgConstraintRow>(sql)
            .bind(schema)
            .bind(&row.table_name)
            .fetch_all(self.pool)
            .await?;

        for con in constraint_rows {
            let kind = match con.constraint_type.as_str() {
                "p" => ConstraintKind::PrimaryKey,
                "u" => ConstraintKind::Unique,
                "f" => ConstraintKind::ForeignKey {
                    references: TableRef {
                        schema: con.ref_schema.as_deref().map(Self::ident),
                        table: Self::ident(con.ref_table.as_deref().unwrap_or_default()),
                    },
                    referenced_columns: Self::idents(&con.ref_columns),
                    on_delete: referential_action(&con.on_delete),
                    on_update: referential_action(&con.on_update),
                },
                "c" => ConstraintKind::Check {
                    expression: check_expression(&con.definition),
                },
                _ => continue,
            };
            let columns = match kind {
                ConstraintKind::Check { .. } => Vec::new(),
                _ => Self::idents(&con.columns),
            };

            table.add_constraint(Constraint {
                name: Some(Self::ident(&con.constraint_name)),
                columns,
                kind,
            });
        }

        // Indexes backing a constraint are covered by the constraint
        let sql = r#"
            SELECT
                i.relname::text AS index_name,
                ARRAY(
                    SELECT a.attname::text
                    FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_catalog.pg_attribute a
                        ON a.attrelid = ix.indrelid AND a.attnum = k.attnum
                    ORDER BY k.ord
                ) AS columns,
                ix.indisunique AS is_unique,
                am.amname::text AS index_method
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_am am ON am.oid = i.relam
            WHERE n.nspname = $1 AND t.relname = $2
                AND NOT EXISTS (
                    SELECT 1 FROM pg_catalog.pg_constraint con WHERE con.conindid = ix.indexrelid
                )
            ORDER BY i.relname
        "#;

        let index_rows = sqlx::query_as::<_, PgIndexRow>(sql)
            .bind(schema)
            .bind(&row.table_name)
            .fetch_all(self.pool)
            .await?;

        for idx in index_rows {
            if idx.columns.is_empty() {
                tracing::debug!(index = %idx.index_name, "Skipping expression index");
                continue;
            }
            table.add_index(Index {
                name: Some(Self::ident(&idx.index_name)),
                columns: Self::idents(&idx.columns),
                unique: idx.is_unique,
                method: Some(idx.index_method),
            });
        }

        Ok(table)
    }
}

/// `CHECK ((total > 0)) NOT VALID` -> `(total > 0)`
fn check_expression(definition: &str) -> String {
    let definition = definition.trim();
    let definition = definition
        .strip_prefix("CHECK")
        .unwrap_or(definition)
        .trim();
    definition
        .strip_suffix("NOT VALID")
        .unwrap_or(definition)
        .trim()
        .to_string()
}

#[async_trait]
impl<'a> Introspector for PostgresIntrospector<'a> {
    async fn schema_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT nspname::text
            FROM pg_catalog.pg_namespace
            WHERE nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
                AND nspname NOT LIKE 'pg_temp_%'
                AND nspname NOT LIKE 'pg_toast_temp_%'
            ORDER BY nspname
        "#;

        let names: Vec<(String,)> = sqlx::query_as(sql).fetch_all(self.pool).await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn introspect_schema(&self, schema: &str) -> Result<Schema> {
        let mut db_schema = Schema::new(&Self::ident(schema));

        let sql = r#"
            SELECT
                c.relname::text AS table_name,
                pg_catalog.obj_description(c.oid, 'pg_class') AS comment
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relkind IN ('r', 'p') AND NOT c.relispartition
            ORDER BY c.relname
        "#;

        let table_rows = sqlx::query_as::<_, PgTableRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in table_rows {
            let table = self.table(schema, row).await?;
            db_schema.add_table(table);
        }

        let sql = r#"
            SELECT
                c.relname::text AS view_name,
                pg_catalog.pg_get_viewdef(c.oid) AS definition,
                ARRAY(
                    SELECT a.attname::text
                    FROM pg_catalog.pg_attribute a
                    WHERE a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
                    ORDER BY a.attnum
                ) AS columns
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relkind IN ('v', 'm')
            ORDER BY c.relname
        "#;

        let view_rows = sqlx::query_as::<_, PgViewRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in view_rows {
            db_schema.add_view(View {
                name: Self::ident(&row.view_name),
                definition: row.definition.unwrap_or_default(),
                columns: Self::idents(&row.columns),
            });
        }

        // Sequences owned by serial or identity columns are part of the column
        let sql = r#"
            SELECT
                s.sequencename::text AS sequence_name,
                s.start_value,
                s.increment_by AS increment,
                s.min_value,
                s.max_value,
                s.cycle
            FROM pg_catalog.pg_sequences s
            WHERE s.schemaname = $1
                AND NOT EXISTS (
                    SELECT 1
                    FROM pg_catalog.pg_depend d
                    JOIN pg_catalog.pg_class c ON c.oid = d.objid
                    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                    WHERE c.relname = s.sequencename
                        AND n.nspname = s.schemaname
                        AND c.relkind = 'S'
                        AND d.deptype IN ('a', 'i')
                )
            ORDER BY s.sequencename
        "#;

        let sequence_rows = sqlx::query_as::<_, PgSequenceRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in sequence_rows {
            db_schema.add_sequence(Sequence {
                name: Self::ident(&row.sequence_name),
                start_value: row.start_value,
                increment: row.increment,
                min_value: row.min_value,
                max_value: row.max_value,
                cycle: row.cycle,
            });
        }

        Ok(db_schema)
    }
}

// Row types for MySQL queries
#[derive(FromRow)]
struct MySqlTableRow {
    table_name: String,
    table_comment: Option<String>,
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    ordinal_position: i64,
    extra: Option<String>,
    column_comment: Option<String>,
}

#[derive(FromRow)]
struct MySqlKeyRow {
    constraint_name: String,
    constraint_type: String,
    column_name: String,
    ref_schema: Option<String>,
    ref_table: Option<String>,
    ref_column: Option<String>,
    on_delete: Option<String>,
    on_update: Option<String>,
}

#[derive(FromRow)]
struct MySqlCheckRow {
    constraint_name: String,
    check_clause: String,
}

#[derive(FromRow)]
struct MySqlIndexRow {
    index_name: String,
    column_name: Option<String>,
    non_unique: i64,
    index_type: String,
}

#[derive(FromRow)]
struct MySqlViewRow {
    view_name: String,
    view_definition: Option<String>,
}

/// MySQL catalog introspection; a MySQL database is a schema
struct MySqlIntrospector<'a> {
    pool: &'a Pool<MySql>,
}

impl<'a> MySqlIntrospector<'a> {
    async fn table(&self, schema: &str, row: MySqlTableRow) -> Result<Table> {
        let table_name = row.table_name;
        let mut table = Table::new(&table_name);
        table.comment = non_empty(row.table_comment);

        let sql = r#"
            SELECT
                COLUMN_NAME AS column_name,
                COLUMN_TYPE AS column_type,
                IS_NULLABLE AS is_nullable,
                COLUMN_DEFAULT AS column_default,
                CAST(ORDINAL_POSITION AS SIGNED) AS ordinal_position,
                EXTRA AS extra,
                COLUMN_COMMENT AS column_comment
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let column_rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(schema)
            .bind(&table_name)
            .fetch_all(self.pool)
            .await?;

        for col in column_rows {
            let auto_increment = col
                .extra
                .as_deref()
                .map_or(false, |e| e.to_lowercase().contains("auto_increment"));

            table.add_column(Column {
                name: col.column_name,
                data_type: col.column_type,
                nullable: col.is_nullable == "YES",
                default: col.column_default,
                ordinal_position: u32::try_from(col.ordinal_position).unwrap_or(0),
                auto_increment,
                comment: non_empty(col.column_comment),
            });
        }

        let sql = r#"
            SELECT
                tc.CONSTRAINT_NAME AS constraint_name,
                tc.CONSTRAINT_TYPE AS constraint_type,
                kcu.COLUMN_NAME AS column_name,
                kcu.REFERENCED_TABLE_SCHEMA AS ref_schema,
                kcu.REFERENCED_TABLE_NAME AS ref_table,
                kcu.REFERENCED_COLUMN_NAME AS ref_column,
                rc.DELETE_RULE AS on_delete,
                rc.UPDATE_RULE AS on_update
            FROM information_schema.TABLE_CONSTRAINTS tc
            JOIN information_schema.KEY_COLUMN_USAGE kcu
                ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                AND kcu.TABLE_NAME = tc.TABLE_NAME
            LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
                ON rc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
                AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
            ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let key_rows = sqlx::query_as::<_, MySqlKeyRow>(sql)
            .bind(schema)
            .bind(&table_name)
            .fetch_all(self.pool)
            .await?;

        // One row per constraint column, in column order
        let mut constraints: IndexMap<String, Constraint> = IndexMap::new();
        for key in key_rows {
            let constraint = constraints
                .entry(key.constraint_name.clone())
                .or_insert_with(|| {
                    let kind = match key.constraint_type.as_str() {
                        "PRIMARY KEY" => ConstraintKind::PrimaryKey,
                        "UNIQUE" => ConstraintKind::Unique,
                        _ => ConstraintKind::ForeignKey {
                            references: TableRef {
                                schema: key.ref_schema.clone(),
                                table: key.ref_table.clone().unwrap_or_default(),
                            },
                            referenced_columns: Vec::new(),
                            on_delete: key.on_delete.clone(),
                            on_update: key.on_update.clone(),
                        },
                    };
                    Constraint {
                        name: Some(key.constraint_name.clone()),
                        columns: Vec::new(),
                        kind,
                    }
                });

            constraint.columns.push(key.column_name);
            if let (
                ConstraintKind::ForeignKey {
                    referenced_columns, ..
                },
                Some(ref_column),
            ) = (&mut constraint.kind, key.ref_column)
            {
                referenced_columns.push(ref_column);
            }
        }

        let sql = r#"
            SELECT
                cc.CONSTRAINT_NAME AS constraint_name,
                cc.CHECK_CLAUSE AS check_clause
            FROM information_schema.CHECK_CONSTRAINTS cc
            JOIN information_schema.TABLE_CONSTRAINTS tc
                ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? AND tc.CONSTRAINT_TYPE = 'CHECK'
            ORDER BY cc.CONSTRAINT_NAME
        "#;

        let check_rows = sqlx::query_as::<_, MySqlCheckRow>(sql)
            .bind(schema)
            .bind(&table_name)
            .fetch_all(self.pool)
            .await?;

        for check in check_rows {
            constraints.insert(
                check.constraint_name.clone(),
                Constraint::check(Some(&check.constraint_name), &check.check_clause),
            );
        }

        let sql = r#"
            SELECT
                INDEX_NAME AS index_name,
                COLUMN_NAME AS column_name,
                CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                INDEX_TYPE AS index_type
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let index_rows = sqlx::query_as::<_, MySqlIndexRow>(sql)
            .bind(schema)
            .bind(&table_name)
            .fetch_all(self.pool)
            .await?;

        // MySQL backs every key constraint with an index of the same name
        let mut indexes: IndexMap<String, Index> = IndexMap::new();
        for idx in index_rows {
            if constraints.contains_key(&idx.index_name) {
                continue;
            }
            let index = indexes.entry(idx.index_name.clone()).or_insert_with(|| Index {
                name: Some(idx.index_name.clone()),
                columns: Vec::new(),
                unique: idx.non_unique == 0,
                method: Some(idx.index_type.to_lowercase()),
            });
            if let Some(column) = idx.column_name {
                index.columns.push(column);
            }
        }

        for (_, constraint) in constraints {
            table.add_constraint(constraint);
        }
        for (name, index) in indexes {
            if index.columns.is_empty() {
                tracing::debug!(index = %name, "Skipping functional index");
                continue;
            }
            table.add_index(index);
        }

        Ok(table)
    }
}

#[async_trait]
impl<'a> Introspector for MySqlIntrospector<'a> {
    async fn schema_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT SCHEMA_NAME
            FROM information_schema.SCHEMATA
            WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
            ORDER BY SCHEMA_NAME
        "#;

        let names: Vec<(String,)> = sqlx::query_as(sql).fetch_all(self.pool).await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn introspect_schema(&self, schema: &str) -> Result<Schema> {
        let mut db_schema = Schema::new(schema);

        let sql = r#"
            SELECT TABLE_NAME AS table_name, TABLE_COMMENT AS table_comment
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let table_rows = sqlx::query_as::<_, MySqlTableRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in table_rows {
            let table = self.table(schema, row).await?;
            db_schema.add_table(table);
        }

        let sql = r#"
            SELECT TABLE_NAME AS view_name, VIEW_DEFINITION AS view_definition
            FROM information_schema.VIEWS
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME
        "#;

        let view_rows = sqlx::query_as::<_, MySqlViewRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await?;

        for row in view_rows {
            let sql = r#"
                SELECT COLUMN_NAME
                FROM information_schema.COLUMNS
                WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
                ORDER BY ORDINAL_POSITION
            "#;

            let columns: Vec<(String,)> = sqlx::query_as(sql)
                .bind(schema)
                .bind(&row.view_name)
                .fetch_all(self.pool)
                .await?;

            db_schema.add_view(View {
                name: row.view_name,
                definition: row.view_definition.unwrap_or_default(),
                columns: columns.into_iter().map(|(name,)| name).collect(),
            });
        }

        Ok(db_schema)
    }
}

/// Rows of `PRAGMA foreign_key_list` sharing one id
struct PendingForeignKey {
    ref_table: String,
    columns: Vec<String>,
    ref_columns: Vec<Option<String>>,
    on_delete: String,
    on_update: String,
}

/// SQLite catalog introspection; everything lives in `main`
struct SqliteIntrospector<'a> {
    pool: &'a Pool<Sqlite>,
}

fn pragma(name: &str, argument: &str) -> String {
    format!("PRAGMA {}(\"{}\")", name, argument.replace('"', "\"\""))
}

impl<'a> SqliteIntrospector<'a> {
    /// Primary key columns of a table in key order
    async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(&pragma("table_info", table_name))
            .fetch_all(self.pool)
            .await?;

        let mut keyed = Vec::new();
        for row in rows {
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                keyed.push((pk, row.try_get::<String, _>("name")?));
            }
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    async fn table(&self, table_name: &str) -> Result<Table> {
        let mut table = Table::new(table_name);

        let column_rows = sqlx::query(&pragma("table_info", table_name))
            .fetch_all(self.pool)
            .await?;

        let mut primary_key: Vec<(i64, String)> = Vec::new();
        for (i, col) in column_rows.iter().enumerate() {
            let name: String = col.try_get("name")?;
            let data_type: String = col.try_get("type")?;
            let notnull: i64 = col.try_get("notnull")?;
            let dflt_value: Option<String> = col.try_get("dflt_value")?;
            let pk: i64 = col.try_get("pk")?;

            if pk > 0 {
                primary_key.push((pk, name.clone()));
            }

            table.add_column(Column {
                name,
                data_type,
                nullable: notnull == 0 && pk == 0,
                default: dflt_value,
                ordinal_position: i as u32 + 1,
                auto_increment: false,
                comment: None,
            });
        }

        primary_key.sort();
        if let [(_, only)] = primary_key.as_slice() {
            // A single INTEGER primary key aliases the rowid
            if let Some(column) = table.columns.iter_mut().find(|c| &c.name == only) {
                column.auto_increment = column.data_type.eq_ignore_ascii_case("integer");
            }
        }
        if !primary_key.is_empty() {
            table.add_constraint(Constraint {
                name: None,
                columns: primary_key.into_iter().map(|(_, name)| name).collect(),
                kind: ConstraintKind::PrimaryKey,
            });
        }

        let fk_rows = sqlx::query(&pragma("foreign_key_list", table_name))
            .fetch_all(self.pool)
            .await?;

        let mut foreign_keys: IndexMap<i64, PendingForeignKey> = IndexMap::new();
        for row in fk_rows {
            let id: i64 = row.try_get("id")?;
            let ref_table: String = row.try_get("table")?;
            let from: String = row.try_get("from")?;
            let to: Option<String> = row.try_get("to")?;
            let on_update: String = row.try_get("on_update")?;
            let on_delete: String = row.try_get("on_delete")?;

            let pending = foreign_keys.entry(id).or_insert_with(|| PendingForeignKey {
                ref_table,
                columns: Vec::new(),
                ref_columns: Vec::new(),
                on_delete,
                on_update,
            });
            pending.columns.push(from);
            pending.ref_columns.push(to);
        }

        for (_, fk) in foreign_keys {
            // Omitted target columns mean the referenced primary key
            let referenced_columns = if fk.ref_columns.iter().all(Option::is_some) {
                fk.ref_columns.into_iter().flatten().collect()
            } else {
                self.primary_key_columns(&fk.ref_table).await?
            };

            table.add_constraint(Constraint {
                name: None,
                columns: fk.columns,
                kind: ConstraintKind::ForeignKey {
                    references: TableRef::new(None, &fk.ref_table),
                    referenced_columns,
                    on_delete: Some(fk.on_delete),
                    on_update: Some(fk.on_update),
                },
            });
        }

        let index_rows = sqlx::query(&pragma("index_list", table_name))
            .fetch_all(self.pool)
            .await?;

        for row in index_rows {
            let index_name: String = row.try_get("name")?;
            let unique: i64 = row.try_get("unique")?;
            let origin: String = row.try_get("origin")?;
            if origin == "pk" {
                continue;
            }

            let info = sqlx::query(&pragma("index_info", &index_name))
                .fetch_all(self.pool)
                .await?;
            let mut columns = Vec::with_capacity(info.len());
            for column in info {
                if let Some(name) = column.try_get::<Option<String>, _>("name")? {
                    columns.push(name);
                }
            }
            if columns.is_empty() {
                continue;
            }

            if origin == "u" {
                // UNIQUE constraints are backed by sqlite_autoindex_* indexes
                table.add_constraint(Constraint {
                    name: Some(index_name),
                    columns,
                    kind: ConstraintKind::Unique,
                });
            } else {
                table.add_index(Index {
                    name: Some(index_name),
                    columns,
                    unique: unique != 0,
                    method: None,
                });
            }
        }

        Ok(table)
    }
}

#[async_trait]
impl<'a> Introspector for SqliteIntrospector<'a> {
    async fn schema_names(&self) -> Result<Vec<String>> {
        Ok(vec!["main".to_string()])
    }

    async fn introspect_schema(&self, schema: &str) -> Result<Schema> {
        if schema != "main" {
            return Err(Error::DatabaseError(format!(
                "SQLite only supports the main schema, not '{}'",
                schema
            )));
        }
        let mut db_schema = Schema::new(schema);

        let sql = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        let table_names: Vec<(String,)> = sqlx::query_as(sql).fetch_all(self.pool).await?;

        for (table_name,) in table_names {
            let table = self.table(&table_name).await?;
            db_schema.add_table(table);
        }

        let sql = r#"SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name"#;
        let rows = sqlx::query(sql).fetch_all(self.pool).await?;

        for row in rows {
            let view_name: String = row.try_get("name")?;
            let definition: Option<String> = row.try_get("sql")?;

            let columns_info = sqlx::query(&pragma("table_info", &view_name))
                .fetch_all(self.pool)
                .await?;
            let mut columns = Vec::with_capacity(columns_info.len());
            for col in columns_info {
                columns.push(col.try_get::<String, _>("name")?);
            }

            db_schema.add_view(View {
                name: view_name,
                definition: definition.unwrap_or_default(),
                columns,
            });
        }

        Ok(db_schema)
    }
}
