use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::{ForeignKey, TableConstraint};
use crate::types::{ColumnType, DataKind, GeneratedExpression, IdentityGeneration};

/// Top-level catalog snapshot for a database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaCatalog {
    /// Contract version for this catalog format.
    pub catalog_version: String,
    /// Database engine identifier (e.g. `mysql`, `oracle`).
    pub engine: String,
    /// Database name when available.
    #[serde(default)]
    pub database: Option<String>,
    /// Tables captured from the database.
    pub tables: Vec<Table>,
}

impl SchemaCatalog {
    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&Table> {
        let name = unqualified(name);
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }
}

/// A table in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<TableConstraint>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Table {
    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns sorted by ordinal position.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|column| column.ordinal_position);
        columns
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.constraints
            .iter()
            .find_map(|constraint| match constraint {
                TableConstraint::PrimaryKey(pk) => {
                    Some(pk.columns.iter().map(String::as_str).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key_columns()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column))
    }

    /// True when the column is covered by a single-column PK or unique constraint.
    pub fn is_unique(&self, column: &str) -> bool {
        self.constraints.iter().any(|constraint| match constraint {
            TableConstraint::PrimaryKey(pk) => single_column_match(&pk.columns, column),
            TableConstraint::Unique(unique) => single_column_match(&unique.columns, column),
            TableConstraint::ForeignKey(_) => false,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            TableConstraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }

    /// Number of FK edges declared by the table; used as statement priority.
    pub fn fk_count(&self) -> usize {
        self.foreign_keys().count()
    }

    /// FK whose local columns include `column`.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys().find(|fk| {
            fk.columns
                .iter()
                .any(|name| name.eq_ignore_ascii_case(column))
        })
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.foreign_key_for(column).is_some()
    }
}

/// Column metadata for a table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub ordinal_position: i16,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityGeneration>,
    #[serde(default)]
    pub generated: Option<GeneratedExpression>,
    /// Allowed labels for enum-typed columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    pub fn is_identity(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.column_type.max_length()
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Value family, with Oracle-style `NUMBER(1)` flags treated as booleans.
    pub fn data_kind(&self) -> DataKind {
        let kind = self.column_type.kind();
        if kind == DataKind::Integer
            && self.column_type.base_name() == "number"
            && self.column_type.precision() == Some(1)
            && looks_boolean(&self.name)
        {
            return DataKind::Boolean;
        }
        kind
    }
}

fn looks_boolean(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("is_")
        || name.starts_with("has_")
        || name.starts_with("can_")
        || name.ends_with("_flag")
        || matches!(name.as_str(), "active" | "enabled" | "deleted" | "verified")
}

fn single_column_match(columns: &[String], column: &str) -> bool {
    columns.len() == 1 && columns[0].eq_ignore_ascii_case(column)
}

/// Strip a schema qualifier and identifier quotes from a table name.
pub fn unqualified(name: &str) -> &str {
    let name = name.rsplit('.').next().unwrap_or(name);
    name.trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
}
