//! Model snapshotter
//!
//! Builds the catalog an ORM would create from Rust entity definitions.
//! Entities come from two places: types deriving [`Entity`] registered at
//! compile time, and structs found by scanning source trees with `syn`.
//!
//! ```ignore
//! #[derive(Entity)]
//! #[entity(table = "orders")]
//! struct Order {
//!     #[column(primary_key, auto_increment)]
//!     id: i64,
//!     #[column(references = "users.id")]
//!     user_id: i64,
//!     total: Option<rust_decimal::Decimal>,
//! }
//! ```

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use syn::{parse_file, Attribute, Fields, Item, ItemStruct, LitBool, LitStr};
use walkdir::WalkDir;

use crate::catalog::types::{Column, Constraint, ConstraintKind, Index, Schema, Table, TableRef};
use crate::catalog::Catalog;
use crate::config::{ModelsConfig, NamingConfig, TypeMappingConfig};
use crate::error::{Error, Result};
use crate::snapshot::Snapshotter;
use crate::utils::naming::{
    generated_constraint_name, get_column_name, get_constraint_name, get_table_name,
};

/// A type that describes the table it maps to.
///
/// Implemented by `#[derive(Entity)]`.
pub trait Entity {
    fn entity_definition() -> EntityDefinition;
}

/// Struct-level mapping of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Rust struct name
    pub name: String,
    /// Explicit table name; derived from `name` by the naming config if unset
    pub table: Option<String>,
    pub schema: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

/// Field-level mapping of one entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub rust_type: String,
    pub column_name: Option<String>,
    /// Explicit SQL type; mapped from `rust_type` if unset
    pub sql_type: Option<String>,
    /// Explicit nullability; `Option<T>` fields are nullable if unset
    pub nullable: Option<bool>,
    pub primary_key: bool,
    pub unique: bool,
    pub indexed: bool,
    pub auto_increment: bool,
    pub default: Option<String>,
    /// `table.column` or `schema.table.column`
    pub references: Option<String>,
    pub comment: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: &str, rust_type: &str) -> Self {
        Self {
            name: name.to_string(),
            rust_type: rust_type.to_string(),
            column_name: None,
            sql_type: None,
            nullable: None,
            primary_key: false,
            unique: false,
            indexed: false,
            auto_increment: false,
            default: None,
            references: None,
            comment: None,
        }
    }
}

/// Registry for entity definitions
pub struct ModelRegistry {
    models: IndexMap<String, EntityDefinition>,
    config: ModelsConfig,
}

impl ModelRegistry {
    /// Create a new model registry
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            models: IndexMap::new(),
            config: config.clone(),
        }
    }

    /// Register a type deriving [`Entity`]
    pub fn register<E: Entity>(&mut self) -> Result<()> {
        self.register_definition(E::entity_definition())
    }

    pub fn register_definition(&mut self, definition: EntityDefinition) -> Result<()> {
        if self.models.contains_key(&definition.name) {
            return Err(Error::ModelRegistrationError(format!(
                "Entity {} is registered twice",
                definition.name
            )));
        }
        tracing::debug!(entity = %definition.name, fields = definition.fields.len(), "Registered entity");
        self.models.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Scan the configured paths for entity structs and register them.
    ///
    /// Returns the number of entities found.
    pub fn scan_and_register(&mut self) -> Result<usize> {
        let paths = self.config.paths.clone();
        let exclude_paths = self.config.exclude_paths.clone().unwrap_or_default();
        let before = self.models.len();

        for path in &paths {
            let base_path = Path::new(path);

            if !base_path.exists() {
                return Err(Error::ModelRegistrationError(format!(
                    "Path does not exist: {}",
                    path
                )));
            }

            let mut walker = WalkDir::new(base_path).follow_links(true).sort_by_file_name();
            if !self.config.recursive_scan {
                walker = walker.max_depth(1);
            }

            for entry in walker
                .into_iter()
                .filter_entry(|e| !exclude_paths.iter().any(|x| e.path().starts_with(x)))
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && path.extension().map_or(false, |ext| ext == "rs") {
                    self.process_file(path)?;
                }
            }
        }

        let found = self.models.len() - before;
        tracing::info!(entities = found, "Scanned model sources");
        Ok(found)
    }

    /// Process a Rust file and extract entity definitions
    fn process_file(&mut self, file_path: &Path) -> Result<()> {
        let file_content = std::fs::read_to_string(file_path)?;
        let syntax = parse_file(&file_content).map_err(|e| {
            Error::SyntaxError(format!("Failed to parse {}: {}", file_path.display(), e))
        })?;

        for item in syntax.items {
            if let Item::Struct(item_struct) = item {
                if self.is_entity(&item_struct.attrs) {
                    let definition = parse_entity(&item_struct)?;
                    self.register_definition(definition)?;
                }
            }
        }

        Ok(())
    }

    /// Whether a struct carries a marker attribute or derives `Entity`
    fn is_entity(&self, attrs: &[Attribute]) -> bool {
        attrs.iter().any(|attr| {
            let marked = attr
                .path()
                .segments
                .last()
                .map_or(false, |seg| self.config.attributes.iter().any(|a| seg.ident == a));
            marked || (attr.path().is_ident("derive") && derives_entity(attr))
        })
    }

    /// Build the catalog the registered entities describe
    pub fn to_catalog(&self, naming: &NamingConfig, type_mapping: &TypeMappingConfig) -> Result<Catalog> {
        let dialect = self.config.dialect();
        let default_schema = self
            .config
            .schema
            .clone()
            .or_else(|| dialect.default_schema.clone())
            .unwrap_or_else(|| "public".to_string());

        let mut schemas: IndexMap<String, Schema> = IndexMap::new();
        for model in self.models.values() {
            let schema_name = model.schema.clone().unwrap_or_else(|| default_schema.clone());
            let table = self.model_table(model, naming, type_mapping)?;
            schemas
                .entry(schema_name.clone())
                .or_insert_with(|| Schema::new(&schema_name))
                .add_table(table);
        }

        Catalog::with_dialect(dialect, schemas.into_values().collect())
    }

    fn model_table(
        &self,
        model: &EntityDefinition,
        naming: &NamingConfig,
        type_mapping: &TypeMappingConfig,
    ) -> Result<Table> {
        let table_name = model.table.clone().unwrap_or_else(|| {
            get_table_name(&model.name, &naming.table_style, naming.pluralize_tables)
        });
        let mut table = Table::new(&table_name);
        let mut primary_key = Vec::new();

        for field in &model.fields {
            let column_name = field
                .column_name
                .clone()
                .unwrap_or_else(|| get_column_name(&field.name, &naming.column_style));
            let data_type = match &field.sql_type {
                Some(t) => t.clone(),
                None => map_type_to_db_type(&field.rust_type, type_mapping)?,
            };
            let nullable = !field.primary_key
                && field
                    .nullable
                    .unwrap_or_else(|| option_inner(&normalize_type(&field.rust_type)).is_some());

            table.add_column(Column {
                name: column_name.clone(),
                data_type,
                nullable,
                default: field.default.clone(),
                ordinal_position: 0,
                auto_increment: field.auto_increment,
                comment: field.comment.clone(),
            });

            let columns = vec![column_name.clone()];
            if field.primary_key {
                primary_key.push(column_name.clone());
            }
            if field.unique {
                let name = constraint_name(&naming.unique_pattern, "UK", &table_name, &columns);
                table.add_constraint(Constraint {
                    name: Some(name),
                    columns: columns.clone(),
                    kind: ConstraintKind::Unique,
                });
            }
            if field.indexed {
                let name = constraint_name(&naming.index_pattern, "IDX", &table_name, &columns);
                table.add_index(Index {
                    name: Some(name),
                    columns: columns.clone(),
                    unique: false,
                    method: None,
                });
            }
            if let Some(reference) = &field.references {
                let (references, referenced_column) = parse_reference(reference).ok_or_else(|| {
                    Error::ModelRegistrationError(format!(
                        "{}.{}: reference '{}' is not of the form table.column",
                        model.name, field.name, reference
                    ))
                })?;
                let name =
                    constraint_name(&naming.foreign_key_pattern, "FK", &table_name, &columns);
                table.add_constraint(Constraint {
                    name: Some(name),
                    columns,
                    kind: ConstraintKind::ForeignKey {
                        references,
                        referenced_columns: vec![referenced_column],
                        on_delete: None,
                        on_update: None,
                    },
                });
            }
        }

        if !primary_key.is_empty() {
            // The database names the primary key unless a pattern says otherwise
            let name = naming
                .primary_key_pattern
                .as_deref()
                .map(|pattern| get_constraint_name(pattern, &table_name, &primary_key));
            table.add_constraint(Constraint {
                name,
                columns: primary_key,
                kind: ConstraintKind::PrimaryKey,
            });
        }

        Ok(table)
    }

    pub fn models(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.models.values()
    }

    /// Get a specific model by struct name
    pub fn get_model(&self, name: &str) -> Option<&EntityDefinition> {
        self.models.get(name)
    }
}

fn constraint_name(pattern: &Option<String>, prefix: &str, table: &str, columns: &[String]) -> String {
    match pattern {
        Some(pattern) => get_constraint_name(pattern, table, columns),
        None => generated_constraint_name(prefix, table, columns),
    }
}

/// `users.id` or `auth.users.id`
fn parse_reference(reference: &str) -> Option<(TableRef, String)> {
    let parts: Vec<&str> = reference.split('.').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    match parts.as_slice() {
        [table, column] => Some((TableRef::new(None, table), column.to_string())),
        [schema, table, column] => Some((TableRef::new(Some(schema), table), column.to_string())),
        _ => None,
    }
}

fn derives_entity(attr: &Attribute) -> bool {
    let mut found = false;
    let _ = attr.parse_nested_meta(|meta| {
        if meta.path.segments.last().map_or(false, |seg| seg.ident == "Entity") {
            found = true;
        }
        Ok(())
    });
    found
}

/// Parse an entity struct and its `#[entity]` / `#[column]` attributes
pub fn parse_entity(item_struct: &ItemStruct) -> Result<EntityDefinition> {
    let struct_name = item_struct.ident.to_string();
    let syntax_error =
        |e: syn::Error| Error::SyntaxError(format!("{}: {}", struct_name, e));

    let mut definition = EntityDefinition {
        name: struct_name.clone(),
        table: None,
        schema: None,
        fields: Vec::new(),
    };

    for attr in item_struct.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                definition.table = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("schema") {
                definition.schema = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unsupported entity attribute"));
            }
            Ok(())
        })
        .map_err(syntax_error)?;
    }

    let named = match &item_struct.fields {
        Fields::Named(named) => &named.named,
        _ => {
            return Err(Error::ModelRegistrationError(format!(
                "Only named fields are supported in struct: {}",
                struct_name
            )))
        }
    };

    for field in named {
        let Some(ident) = &field.ident else { continue };
        let rust_type = normalize_type(&quote::ToTokens::to_token_stream(&field.ty).to_string());
        let mut definition_field = FieldDefinition::new(&ident.to_string(), &rust_type);
        let mut skip = false;

        for attr in field
            .attrs
            .iter()
            .filter(|a| a.path().is_ident("column") && !matches!(a.meta, syn::Meta::Path(_)))
        {
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("skip") {
                    skip = true;
                } else if path.is_ident("name") {
                    definition_field.column_name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("sql_type") {
                    definition_field.sql_type = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("default") {
                    definition_field.default = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("references") {
                    definition_field.references = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("comment") {
                    definition_field.comment = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("nullable") {
                    definition_field.nullable = Some(flag(&meta)?);
                } else if path.is_ident("primary_key") {
                    definition_field.primary_key = flag(&meta)?;
                } else if path.is_ident("unique") {
                    definition_field.unique = flag(&meta)?;
                } else if path.is_ident("index") {
                    definition_field.indexed = flag(&meta)?;
                } else if path.is_ident("auto_increment") {
                    definition_field.auto_increment = flag(&meta)?;
                } else {
                    return Err(meta.error("unsupported column attribute"));
                }
                Ok(())
            })
            .map_err(syntax_error)?;
        }

        if !skip {
            definition.fields.push(definition_field);
        }
    }

    Ok(definition)
}

/// `flag` or `flag = true|false`
fn flag(meta: &syn::meta::ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        Ok(meta.value()?.parse::<LitBool>()?.value)
    } else {
        Ok(true)
    }
}

/// Remove token spacing: `Option < String >` -> `Option<String>`
fn normalize_type(rust_type: &str) -> String {
    rust_type.split_whitespace().collect()
}

/// `T` for `Option<T>` (optionally path-qualified)
fn option_inner(rust_type: &str) -> Option<&str> {
    let start = rust_type.find("Option<")?;
    let prefix = &rust_type[..start];
    if !(prefix.is_empty() || prefix.ends_with("::")) {
        return None;
    }
    rust_type[start + "Option<".len()..].strip_suffix('>')
}

/// Map a Rust type to a SQL type.
///
/// Custom mappings win over overrides, which win over the built-in table.
/// `Option<T>` maps like `T`.
pub fn map_type_to_db_type(rust_type: &str, type_mapping: &TypeMappingConfig) -> Result<String> {
    let normalized = normalize_type(rust_type);
    let rust_type = option_inner(&normalized).unwrap_or(&normalized);

    if let Some(custom_mappings) = &type_mapping.custom {
        for mapping in custom_mappings {
            if normalize_type(&mapping.rust_type) == rust_type {
                return Ok(mapping.db_type.clone());
            }
        }
    }

    if let Some(overrides) = &type_mapping.override_ {
        if let Some(db_type) = overrides.get(rust_type) {
            return Ok(db_type.clone());
        }
    }

    if rust_type == "Vec<u8>" {
        return Ok("BYTEA".to_string());
    }

    let head = rust_type.split('<').next().unwrap_or(rust_type);
    match head.rsplit("::").next().unwrap_or(head) {
        "String" | "&str" => Ok("VARCHAR(255)".to_string()),
        "i8" | "i16" => Ok("SMALLINT".to_string()),
        "i32" | "u8" | "u16" | "u32" => Ok("INTEGER".to_string()),
        "i64" | "u64" => Ok("BIGINT".to_string()),
        "f32" => Ok("REAL".to_string()),
        "f64" => Ok("DOUBLE PRECISION".to_string()),
        "bool" => Ok("BOOLEAN".to_string()),
        "NaiveDateTime" => Ok("TIMESTAMP".to_string()),
        "NaiveDate" => Ok("DATE".to_string()),
        "NaiveTime" => Ok("TIME".to_string()),
        "DateTime" => Ok("TIMESTAMP WITH TIME ZONE".to_string()),
        "Uuid" => Ok("UUID".to_string()),
        "Decimal" => Ok("NUMERIC(19,2)".to_string()),
        "Json" | "Value" => Ok("JSONB".to_string()),
        _ => Err(Error::TypeMappingError(format!(
            "No mapping found for Rust type: {}",
            rust_type
        ))),
    }
}

/// Snapshots entity definitions
pub struct ModelSnapshotter {
    config: ModelsConfig,
    naming: NamingConfig,
    type_mapping: TypeMappingConfig,
    entities: Vec<EntityDefinition>,
}

impl ModelSnapshotter {
    pub fn new(config: ModelsConfig, naming: NamingConfig, type_mapping: TypeMappingConfig) -> Self {
        Self {
            config,
            naming,
            type_mapping,
            entities: Vec::new(),
        }
    }

    /// Include a compile-time registered entity
    pub fn with_entity<E: Entity>(mut self) -> Self {
        self.entities.push(E::entity_definition());
        self
    }
}

#[async_trait]
impl Snapshotter for ModelSnapshotter {
    fn source_name(&self) -> String {
        if self.config.paths.is_empty() {
            "registered models".to_string()
        } else {
            format!("models in {}", self.config.paths.join(", "))
        }
    }

    async fn snapshot(&self) -> Result<Catalog> {
        let mut registry = ModelRegistry::new(&self.config);
        for entity in &self.entities {
            registry.register_definition(entity.clone())?;
        }
        if !self.config.paths.is_empty() {
            registry.scan_and_register()?;
        }
        registry.to_catalog(&self.naming, &self.type_mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomTypeMapping;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn models_config(paths: Vec<String>) -> ModelsConfig {
        ModelsConfig {
            paths,
            exclude_paths: None,
            attributes: vec!["entity".to_string()],
            recursive_scan: true,
            dialect: None,
            schema: None,
        }
    }

    #[rstest]
    #[case("String", "VARCHAR(255)")]
    #[case("Option<i64>", "BIGINT")]
    #[case("Option < chrono :: NaiveDateTime >", "TIMESTAMP")]
    #[case("chrono::DateTime<Utc>", "TIMESTAMP WITH TIME ZONE")]
    #[case("uuid::Uuid", "UUID")]
    #[case("Vec<u8>", "BYTEA")]
    fn maps_builtin_types(#[case] rust_type: &str, #[case] expected: &str) {
        let mapped = map_type_to_db_type(rust_type, &TypeMappingConfig::default()).unwrap();
        assert_eq!(mapped, expected);
    }

    #[test]
    fn custom_mappings_take_precedence() {
        let mapping = TypeMappingConfig {
            custom: Some(vec![CustomTypeMapping {
                rust_type: "Money".to_string(),
                db_type: "NUMERIC(12,2)".to_string(),
            }]),
            override_: Some(HashMap::from([("String".to_string(), "TEXT".to_string())])),
        };

        assert_eq!(map_type_to_db_type("Option<Money>", &mapping).unwrap(), "NUMERIC(12,2)");
        assert_eq!(map_type_to_db_type("String", &mapping).unwrap(), "TEXT");
        assert!(matches!(
            map_type_to_db_type("HashSet<u8>", &mapping),
            Err(Error::TypeMappingError(_))
        ));
    }

    #[test]
    fn parses_entity_attributes() {
        let item: ItemStruct = syn::parse_quote! {
            #[entity(table = "orders", schema = "sales")]
            struct Order {
                #[column(primary_key, auto_increment)]
                id: i64,
                #[column(references = "users.id", index)]
                user_id: i64,
                #[column(name = "order_total", sql_type = "DECIMAL(10,2)", nullable = false)]
                total: Option<f64>,
                #[column(skip)]
                cached: bool,
            }
        };

        let definition = parse_entity(&item).unwrap();
        assert_eq!(definition.table.as_deref(), Some("orders"));
        assert_eq!(definition.schema.as_deref(), Some("sales"));
        assert_eq!(definition.fields.len(), 3);

        let id = &definition.fields[0];
        assert!(id.primary_key && id.auto_increment);

        let total = &definition.fields[2];
        assert_eq!(total.rust_type, "Option<f64>");
        assert_eq!(total.column_name.as_deref(), Some("order_total"));
        assert_eq!(total.nullable, Some(false));
    }

    #[test]
    fn rejects_unknown_column_attributes() {
        let item: ItemStruct = syn::parse_quote! {
            struct Order {
                #[column(colour = "red")]
                id: i64,
            }
        };
        assert!(matches!(parse_entity(&item), Err(Error::SyntaxError(_))));
    }

    #[test]
    fn builds_tables_with_generated_names() {
        let mut registry = ModelRegistry::new(&models_config(Vec::new()));
        let mut id = FieldDefinition::new("id", "i64");
        id.primary_key = true;
        let mut email = FieldDefinition::new("email", "Option<String>");
        email.unique = true;
        registry
            .register_definition(EntityDefinition {
                name: "UserAccount".to_string(),
                table: None,
                schema: None,
                fields: vec![id, email],
            })
            .unwrap();

        let catalog = registry
            .to_catalog(&NamingConfig::default(), &TypeMappingConfig::default())
            .unwrap();
        let table = catalog.table(Some("public"), "user_account").unwrap();

        assert!(!table.columns[0].nullable);
        assert!(table.columns[1].nullable);
        assert_eq!(table.columns[1].data_type, "VARCHAR(255)");

        let primary_key = table.primary_key().unwrap();
        assert_eq!(primary_key.name, None);

        let unique = table
            .constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::Unique))
            .unwrap();
        let name = unique.name.as_deref().unwrap();
        assert!(name.starts_with("UK") && name.len() == 27);
    }

    #[test]
    fn naming_patterns_replace_generated_names() {
        let mut registry = ModelRegistry::new(&models_config(Vec::new()));
        let mut user_id = FieldDefinition::new("user_id", "i64");
        user_id.references = Some("users.id".to_string());
        registry
            .register_definition(EntityDefinition {
                name: "Post".to_string(),
                table: None,
                schema: None,
                fields: vec![user_id],
            })
            .unwrap();

        let naming = NamingConfig {
            pluralize_tables: true,
            foreign_key_pattern: Some("fk_{table}_{columns}".to_string()),
            ..NamingConfig::default()
        };
        let catalog = registry
            .to_catalog(&naming, &TypeMappingConfig::default())
            .unwrap();

        let posts = catalog.table(Some("public"), "posts").unwrap();
        assert_eq!(posts.constraints[0].name.as_deref(), Some("fk_posts_user_id"));
        // users lives outside the model set
        assert_eq!(catalog.warnings().len(), 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ModelRegistry::new(&models_config(Vec::new()));
        let definition = EntityDefinition {
            name: "Order".to_string(),
            table: None,
            schema: None,
            fields: Vec::new(),
        };
        registry.register_definition(definition.clone()).unwrap();
        assert!(matches!(
            registry.register_definition(definition),
            Err(Error::ModelRegistrationError(_))
        ));
    }

    #[test]
    fn scans_marked_structs_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("entities");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            nested.join("order.rs"),
            r#"
                #[derive(Debug, schema_parity::Entity)]
                pub struct Order {
                    #[column(primary_key)]
                    pub id: i64,
                    pub note: Option<String>,
                }

                #[entity(table = "customers")]
                pub struct Customer {
                    pub id: i64,
                }

                pub struct NotAnEntity {
                    pub id: i64,
                }
            "#,
        )
        .unwrap();

        let mut registry =
            ModelRegistry::new(&models_config(vec![dir.path().display().to_string()]));
        assert_eq!(registry.scan_and_register().unwrap(), 2);
        assert!(registry.get_model("Order").is_some());
        assert_eq!(
            registry.get_model("Customer").unwrap().table.as_deref(),
            Some("customers")
        );
        assert!(registry.get_model("NotAnEntity").is_none());
    }

    #[test]
    fn non_recursive_scan_stays_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("order.rs"), "#[entity] pub struct Order { pub id: i64 }")
            .unwrap();

        let mut config = models_config(vec![dir.path().display().to_string()]);
        config.recursive_scan = false;
        let mut registry = ModelRegistry::new(&config);
        assert_eq!(registry.scan_and_register().unwrap(), 0);
    }
}
