use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use jsonschema::JSONSchema;
use schemars::schema_for;
use serde_json::Value;
use tracing::debug;

use crate::constraints::TableConstraint;
use crate::error::{Error, Result};
use crate::schema::SchemaCatalog;

/// JSON Schema describing `catalog.json` documents.
pub fn catalog_json_schema() -> Result<Value> {
    let schema = schema_for!(SchemaCatalog);
    Ok(serde_json::to_value(&schema)?)
}

/// Check a raw catalog document against the catalog JSON Schema.
///
/// Returns one message per structural violation, prefixed with its JSON pointer.
pub fn validate_catalog_json(document: &Value) -> Result<Vec<String>> {
    let schema = catalog_json_schema()?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| Error::InvalidCatalog(err.to_string()))?;

    let mut issues = Vec::new();
    if let Err(errors) = compiled.validate(document) {
        for error in errors {
            let path = error.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            issues.push(format!("{path}: {error}"));
        }
    }
    Ok(issues)
}

/// Read, structurally check, parse and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<SchemaCatalog> {
    let contents = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&contents)?;

    let issues = validate_catalog_json(&document)?;
    if !issues.is_empty() {
        return Err(Error::InvalidCatalog(issues.join("; ")));
    }

    let catalog: SchemaCatalog = serde_json::from_value(document)?;
    validate_catalog(&catalog)?;
    debug!(
        path = %path.display(),
        tables = catalog.tables.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Validate internal consistency of a catalog.
///
/// This checks:
/// - duplicate tables/columns (case-insensitive)
/// - primary key and unique columns exist
/// - foreign key columns and referenced targets exist
pub fn validate_catalog(catalog: &SchemaCatalog) -> Result<()> {
    let mut tables: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for table in &catalog.tables {
        let key = table.name.to_lowercase();
        if tables.contains_key(&key) {
            return Err(Error::InvalidCatalog(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.to_lowercase()) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }

        tables.insert(key, columns);
    }

    for table in &catalog.tables {
        let columns = tables
            .get(&table.name.to_lowercase())
            .ok_or_else(|| Error::UnknownTable(table.name.clone()))?;

        for constraint in &table.constraints {
            match constraint {
                TableConstraint::PrimaryKey(pk) => {
                    require_columns(columns, &pk.columns, &table.name, "primary key")?;
                }
                TableConstraint::Unique(unique) => {
                    require_columns(columns, &unique.columns, &table.name, "unique")?;
                }
                TableConstraint::ForeignKey(fk) => {
                    require_columns(columns, &fk.columns, &table.name, "foreign key")?;

                    let ref_columns = tables
                        .get(&fk.referenced_table.to_lowercase())
                        .ok_or_else(|| {
                            Error::InvalidCatalog(format!(
                                "referenced table not found: {}",
                                fk.referenced_table
                            ))
                        })?;
                    require_columns(
                        ref_columns,
                        &fk.referenced_columns,
                        &fk.referenced_table,
                        "referenced",
                    )?;

                    if fk.columns.len() != fk.referenced_columns.len() {
                        return Err(Error::InvalidCatalog(format!(
                            "foreign key column count mismatch: {} -> {}",
                            table.name, fk.referenced_table
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

fn require_columns(
    known: &BTreeSet<String>,
    columns: &[String],
    table: &str,
    role: &str,
) -> Result<()> {
    for column in columns {
        if !known.contains(&column.to_lowercase()) {
            return Err(Error::InvalidCatalog(format!(
                "{role} column not found: {table}.{column}"
            )));
        }
    }
    Ok(())
}
