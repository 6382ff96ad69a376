use sqlseed_core::SchemaCatalog;
use tracing::debug;

use crate::codec::{DialectFormatter, LiteralCodec};
use crate::errors::GenerationError;
use crate::model::{InsertStatement, RecordSet};

/// Encode every record, grouped by table in generation order.
pub fn render_inserts(
    sets: &[RecordSet],
    generation_order: &[String],
    catalog: &SchemaCatalog,
    codec: &LiteralCodec<'_>,
) -> Result<Vec<InsertStatement>, GenerationError> {
    let mut statements = Vec::with_capacity(sets.len() * generation_order.len());
    for name in generation_order {
        let table = catalog
            .table(name)
            .ok_or_else(|| GenerationError::UnknownTable(name.clone()))?;
        for set in sets {
            if let Some(record) = set.record(&table.name) {
                statements.push(codec.encode(table, record)?);
            }
        }
    }
    debug!(statements = statements.len(), "inserts rendered");
    Ok(statements)
}

/// `DELETE FROM` statements, children first.
pub fn render_teardown(teardown_order: &[String], formatter: &dyn DialectFormatter) -> Vec<String> {
    teardown_order
        .iter()
        .map(|table| format!("DELETE FROM {}", formatter.escape_identifier(table)))
        .collect()
}

/// Join statements into an executable script, one per line.
pub fn to_script<S: AsRef<str>>(statements: &[S]) -> String {
    let mut script = String::new();
    for statement in statements {
        script.push_str(statement.as_ref());
        script.push_str(";\n");
    }
    script
}

impl AsRef<str> for InsertStatement {
    fn as_ref(&self) -> &str {
        &self.sql
    }
}
