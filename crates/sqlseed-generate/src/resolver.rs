use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use sqlseed_core::{SchemaCatalog, dependency_order};
use sqlseed_query::scan_table_refs;
use tracing::{debug, info};

use crate::errors::GenerationError;

/// Tables a query needs, with insert and teardown orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Query tables plus every FK ancestor, catalog spelling, sorted.
    pub required_tables: Vec<String>,
    pub generation_order: Vec<String>,
    pub teardown_order: Vec<String>,
    /// Tables whose FK edges formed a cycle, if any.
    pub cycle: Option<Vec<String>>,
}

/// Read the tables named in `sql`, close them over FK parents and order them.
///
/// A table missing from the catalog is a hard error.
pub fn resolve(sql: &str, catalog: &SchemaCatalog) -> Result<Resolution, GenerationError> {
    let mut named = Vec::new();
    for table_ref in scan_table_refs(&sqlseed_query::normalize_sql(sql)) {
        let table = catalog
            .table(&table_ref.name)
            .ok_or_else(|| GenerationError::UnknownTable(table_ref.name.clone()))?;
        if !named.contains(&table.name) {
            named.push(table.name.clone());
        }
    }

    if named.is_empty() {
        return Err(GenerationError::InvalidOptions(
            "query does not name any table".to_string(),
        ));
    }

    let required = close_over_parents(catalog, &named)?;
    let order = dependency_order(catalog, &required);

    info!(
        query_tables = named.len(),
        required_tables = required.len(),
        order = ?order.generation,
        "dependencies resolved"
    );

    Ok(Resolution {
        required_tables: required.into_iter().collect(),
        generation_order: order.generation,
        teardown_order: order.teardown,
        cycle: order.cycle,
    })
}

fn close_over_parents(
    catalog: &SchemaCatalog,
    named: &[String],
) -> Result<BTreeSet<String>, GenerationError> {
    let mut required: BTreeSet<String> = named.iter().cloned().collect();
    let mut queue: VecDeque<String> = named.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        let table = catalog
            .table(&name)
            .ok_or_else(|| GenerationError::UnknownTable(name.clone()))?;
        for fk in table.foreign_keys() {
            let parent = catalog
                .table(&fk.referenced_table)
                .ok_or_else(|| GenerationError::UnknownTable(fk.referenced_table.clone()))?;
            if required.insert(parent.name.clone()) {
                debug!(table = %table.name, parent = %parent.name, "added FK parent");
                queue.push_back(parent.name.clone());
            }
        }
    }

    Ok(required)
}
