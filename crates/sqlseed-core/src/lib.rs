//! Core contracts and helpers for sqlseed.
//!
//! This crate defines the schema catalog consumed by the extractor,
//! generator and validator, catalog validation, and FK dependency ordering.

pub mod constraints;
pub mod error;
pub mod graph;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{ForeignKey, PrimaryKey, TableConstraint, UniqueConstraint};
pub use error::{Error, Result};
pub use graph::{DependencyOrder, dependency_order};
pub use schema::{Column, SchemaCatalog, Table, unqualified};
pub use types::{ColumnType, DataKind, GeneratedExpression, GeneratedKind, IdentityGeneration};
pub use validation::{catalog_json_schema, load_catalog, validate_catalog, validate_catalog_json};

/// Current contract version for `catalog.json` artifacts.
pub const CATALOG_VERSION: &str = "0.1";
