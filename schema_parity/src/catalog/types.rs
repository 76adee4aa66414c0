//! Type definitions for catalog objects
//!
//! These are plain values. Validation and identity indexing happen when a
//! [`crate::catalog::Catalog`] is built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of structural object tracked in a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Schema,
    Table,
    View,
    Sequence,
    Column,
    Index,
    Constraint,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Schema,
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Sequence,
        ObjectKind::Column,
        ObjectKind::Index,
        ObjectKind::Constraint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::Constraint => "constraint",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named container of tables, views and sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: Vec::new(),
            views: Vec::new(),
            sequences: Vec::new(),
        }
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Add a view to the schema
    pub fn add_view(&mut self, view: View) {
        self.views.push(view);
    }

    /// Add a sequence to the schema
    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            comment: None,
        }
    }

    /// Add a column to the table.
    ///
    /// A column without an ordinal position is placed after the existing ones.
    pub fn add_column(&mut self, mut column: Column) {
        if column.ordinal_position == 0 {
            column.ordinal_position = self.columns.len() as u32 + 1;
        }
        self.columns.push(column);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Add a constraint to the table
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey))
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// 1-based position; 0 means "assign from declaration order"
    #[serde(default)]
    pub ordinal_position: u32,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
            ordinal_position: 0,
            auto_increment: false,
            comment: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Shorthand for `nullable(false)`
    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn position(mut self, ordinal_position: u32) -> Self {
        self.ordinal_position = ordinal_position;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Index {
    pub fn new(name: Option<&str>, columns: &[&str]) -> Self {
        Self {
            name: name.map(str::to_string),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            method: None,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

/// A reference to a table by identity, used by foreign keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// Kind-specific constraint payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey {
        references: TableRef,
        referenced_columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<String>,
    },
    Check {
        expression: String,
    },
}

impl ConstraintKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "primary key",
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey { .. } => "foreign key",
            ConstraintKind::Check { .. } => "check",
        }
    }
}

/// Represents a table constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn primary_key(name: Option<&str>, columns: &[&str]) -> Self {
        Self::with_kind(name, columns, ConstraintKind::PrimaryKey)
    }

    pub fn unique(name: Option<&str>, columns: &[&str]) -> Self {
        Self::with_kind(name, columns, ConstraintKind::Unique)
    }

    pub fn foreign_key(
        name: Option<&str>,
        columns: &[&str],
        references: TableRef,
        referenced_columns: &[&str],
    ) -> Self {
        Self::with_kind(
            name,
            columns,
            ConstraintKind::ForeignKey {
                references,
                referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
                on_delete: None,
                on_update: None,
            },
        )
    }

    pub fn check(name: Option<&str>, expression: &str) -> Self {
        Self::with_kind(
            name,
            &[],
            ConstraintKind::Check {
                expression: expression.to_string(),
            },
        )
    }

    fn with_kind(name: Option<&str>, columns: &[&str], kind: ConstraintKind) -> Self {
        Self {
            name: name.map(str::to_string),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            kind,
        }
    }
}

/// Represents a database view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl View {
    pub fn new(name: &str, definition: &str) -> Self {
        Self {
            name: name.to_string(),
            definition: definition.to_string(),
            columns: Vec::new(),
        }
    }
}

/// Represents a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(default)]
    pub cycle: bool,
}

impl Sequence {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start_value: None,
            increment: None,
            min_value: None,
            max_value: None,
            cycle: false,
        }
    }
}
