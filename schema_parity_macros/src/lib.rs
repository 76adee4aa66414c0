//! Procedural macros for schema_parity
//!
//! This crate provides the `Entity` derive macro, which describes a struct's
//! table mapping to the schema_parity model snapshotter.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitBool, LitStr};

/// Derive `schema_parity::snapshot::models::Entity` for a struct.
///
/// Struct attribute: `#[entity(table = "...", schema = "...")]`.
/// Field attribute: `#[column(name = "...", sql_type = "...", nullable, primary_key,
/// unique, index, auto_increment, default = "...", references = "table.column",
/// comment = "...", skip)]`.
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_entity(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ColumnArgs {
    skip: bool,
    name: Option<String>,
    sql_type: Option<String>,
    nullable: Option<bool>,
    primary_key: bool,
    unique: bool,
    indexed: bool,
    auto_increment: bool,
    default: Option<String>,
    references: Option<String>,
    comment: Option<String>,
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Entity only supports structs")),
    };

    let (table, schema) = parse_entity_args(&input.attrs)?;

    let mut field_definitions = Vec::new();
    for field in fields {
        let args = parse_column_args(&field.attrs)?;
        if args.skip {
            continue;
        }

        let field_name = field.ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
        let rust_type: String = field
            .ty
            .to_token_stream()
            .to_string()
            .split_whitespace()
            .collect();

        let column_name = optional(&args.name);
        let sql_type = optional(&args.sql_type);
        let default = optional(&args.default);
        let references = optional(&args.references);
        let comment = optional(&args.comment);
        let nullable = match args.nullable {
            Some(value) => quote!(::core::option::Option::Some(#value)),
            None => quote!(::core::option::Option::None),
        };
        let ColumnArgs {
            primary_key,
            unique,
            indexed,
            auto_increment,
            ..
        } = args;

        field_definitions.push(quote! {
            ::schema_parity::snapshot::models::FieldDefinition {
                name: #field_name.to_string(),
                rust_type: #rust_type.to_string(),
                column_name: #column_name,
                sql_type: #sql_type,
                nullable: #nullable,
                primary_key: #primary_key,
                unique: #unique,
                indexed: #indexed,
                auto_increment: #auto_increment,
                default: #default,
                references: #references,
                comment: #comment,
            }
        });
    }

    let struct_name = name.to_string();
    let table = optional(&table);
    let schema = optional(&schema);

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::schema_parity::snapshot::models::Entity for #name #ty_generics #where_clause {
            fn entity_definition() -> ::schema_parity::snapshot::models::EntityDefinition {
                ::schema_parity::snapshot::models::EntityDefinition {
                    name: #struct_name.to_string(),
                    table: #table,
                    schema: #schema,
                    fields: vec![#(#field_definitions),*],
                }
            }
        }
    })
}

fn optional(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(value) => quote!(::core::option::Option::Some(#value.to_string())),
        None => quote!(::core::option::Option::None),
    }
}

/// Parse `#[entity(table = "...", schema = "...")]`
fn parse_entity_args(attrs: &[Attribute]) -> syn::Result<(Option<String>, Option<String>)> {
    let mut table = None;
    let mut schema = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        // bare `#[entity]` is only a marker
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("schema") {
                schema = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unsupported entity attribute"));
            }
            Ok(())
        })?;
    }

    Ok((table, schema))
}

fn parse_column_args(attrs: &[Attribute]) -> syn::Result<ColumnArgs> {
    let mut args = ColumnArgs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("skip") {
                args.skip = true;
            } else if path.is_ident("name") {
                args.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("sql_type") {
                args.sql_type = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("default") {
                args.default = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("references") {
                args.references = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("comment") {
                args.comment = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("nullable") {
                args.nullable = Some(flag(&meta)?);
            } else if path.is_ident("primary_key") {
                args.primary_key = flag(&meta)?;
            } else if path.is_ident("unique") {
                args.unique = flag(&meta)?;
            } else if path.is_ident("index") {
                args.indexed = flag(&meta)?;
            } else if path.is_ident("auto_increment") {
                args.auto_increment = flag(&meta)?;
            } else {
                return Err(meta.error("unsupported column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(args)
}

/// `flag` or `flag = true|false`
fn flag(meta: &syn::meta::ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        Ok(meta.value()?.parse::<LitBool>()?.value)
    } else {
        Ok(true)
    }
}
