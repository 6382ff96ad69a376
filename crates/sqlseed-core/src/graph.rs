use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schema::SchemaCatalog;

/// Insert and teardown orders for a set of catalog tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyOrder {
    /// Parents before children; ties by ascending FK count, then name.
    pub generation: Vec<String>,
    /// Children before parents.
    pub teardown: Vec<String>,
    /// Tables left in a cycle, appended to `generation` by priority.
    pub cycle: Option<Vec<String>>,
}

/// Order `tables` so every FK parent precedes its children.
///
/// Ready tables are drained by `(fk_count, name)`, so when sorting by FK
/// count already respects the dependencies the result is exactly that sort.
/// Self references are not ordering edges. Names are the catalog spelling.
pub fn dependency_order(catalog: &SchemaCatalog, tables: &BTreeSet<String>) -> DependencyOrder {
    let graph = build_adjacency(catalog, tables);

    let mut indegree: BTreeMap<String, usize> = graph.keys().map(|node| (node.clone(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let priority = |name: &str| -> (usize, String) {
        let fk_count = catalog.table(name).map(|table| table.fk_count()).unwrap_or(0);
        (fk_count, name.to_string())
    };

    let mut ready: BTreeSet<(usize, String)> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| priority(node))
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(key) = ready.iter().next().cloned() {
        ready.remove(&key);
        let node = key.1;
        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(priority(target));
                    }
                }
            }
        }
        order.push(node);
    }

    let cycle = if order.len() < graph.len() {
        let placed: BTreeSet<&String> = order.iter().collect();
        let mut remaining: Vec<(usize, String)> = graph
            .keys()
            .filter(|node| !placed.contains(node))
            .map(|node| priority(node))
            .collect();
        remaining.sort();
        let remaining: Vec<String> = remaining.into_iter().map(|(_, name)| name).collect();
        warn!(tables = ?remaining, "FK cycle detected; ordering remainder by FK count");
        order.extend(remaining.iter().cloned());
        Some(remaining)
    } else {
        None
    };

    let teardown = order.iter().rev().cloned().collect();
    DependencyOrder {
        generation: order,
        teardown,
        cycle,
    }
}

/// Parent → children edges restricted to `tables`.
fn build_adjacency(
    catalog: &SchemaCatalog,
    tables: &BTreeSet<String>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for name in tables {
        let Some(table) = catalog.table(name) else {
            continue;
        };
        graph.entry(table.name.clone()).or_default();

        for fk in table.foreign_keys() {
            let Some(parent) = catalog.table(&fk.referenced_table) else {
                continue;
            };
            if parent.name.eq_ignore_ascii_case(&table.name) {
                continue;
            }
            if !tables
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&parent.name))
            {
                continue;
            }
            graph
                .entry(parent.name.clone())
                .or_default()
                .insert(table.name.clone());
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ForeignKey, TableConstraint};
    use crate::schema::{Column, Table};
    use crate::types::ColumnType;

    fn column(name: &str) -> Column {
        Column {
            ordinal_position: 1,
            name: name.to_string(),
            column_type: ColumnType {
                data_type: "int".to_string(),
                character_max_length: None,
                numeric_precision: None,
                numeric_scale: None,
            },
            is_nullable: false,
            default: None,
            identity: None,
            generated: None,
            enum_values: Vec::new(),
            comment: None,
        }
    }

    fn fk(column: &str, parent: &str) -> TableConstraint {
        TableConstraint::ForeignKey(ForeignKey {
            name: None,
            columns: vec![column.to_string()],
            referenced_table: parent.to_string(),
            referenced_columns: vec!["id".to_string()],
        })
    }

    fn table(name: &str, constraints: Vec<TableConstraint>) -> Table {
        Table {
            name: name.to_string(),
            columns: vec![column("id"), column("parent_id")],
            constraints,
            comment: None,
        }
    }

    fn catalog(tables: Vec<Table>) -> SchemaCatalog {
        SchemaCatalog {
            catalog_version: "0.1".to_string(),
            engine: "mysql".to_string(),
            database: None,
            tables,
        }
    }

    fn names(catalog: &SchemaCatalog) -> BTreeSet<String> {
        catalog.table_names().map(str::to_string).collect()
    }

    #[test]
    fn parents_precede_children_even_when_counts_disagree() {
        // `b` has two FKs but is the parent of `c`, which has one.
        let catalog = catalog(vec![
            table("a", Vec::new()),
            table("b", vec![fk("parent_id", "a"), fk("id", "a")]),
            table("c", vec![fk("parent_id", "b")]),
        ]);

        let order = dependency_order(&catalog, &names(&catalog));
        assert_eq!(order.generation, vec!["a", "b", "c"]);
        assert_eq!(order.teardown, vec!["c", "b", "a"]);
        assert!(order.cycle.is_none());
    }

    #[test]
    fn ties_break_by_fk_count_then_name() {
        let catalog = catalog(vec![
            table("zeta", Vec::new()),
            table("alpha", vec![fk("parent_id", "zeta")]),
            table("beta", Vec::new()),
        ]);

        let order = dependency_order(&catalog, &names(&catalog));
        assert_eq!(order.generation, vec!["beta", "zeta", "alpha"]);
    }

    #[test]
    fn self_reference_is_not_a_cycle() {
        let catalog = catalog(vec![table("employees", vec![fk("parent_id", "employees")])]);
        let order = dependency_order(&catalog, &names(&catalog));
        assert_eq!(order.generation, vec!["employees"]);
        assert!(order.cycle.is_none());
    }

    #[test]
    fn cycles_are_reported_and_appended() {
        let catalog = catalog(vec![
            table("a", vec![fk("parent_id", "b")]),
            table("b", vec![fk("parent_id", "a")]),
        ]);

        let order = dependency_order(&catalog, &names(&catalog));
        assert_eq!(order.generation.len(), 2);
        let cycle = order.cycle.expect("cycle");
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));
    }
}
