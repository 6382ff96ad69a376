use serde::Serialize;
use sqlseed_core::SchemaCatalog;
use tracing::debug;

use crate::alias::resolve_alias;
use crate::model::{ColumnRef, Constraint, ConstraintSet, JoinCondition};

/// Catalog location of the other side of an equi join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinPeer {
    pub table: String,
    pub column: String,
}

/// A constraint pinned to a catalog table (and column, when it has one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundConstraint {
    pub constraint: Constraint,
    pub table: String,
    /// Catalog spelling when the column exists, otherwise as written.
    pub column: Option<String>,
    pub peer: Option<JoinPeer>,
}

impl BoundConstraint {
    pub fn targets(&self, table: &str, column: &str) -> bool {
        self.table.eq_ignore_ascii_case(table)
            && self
                .column
                .as_deref()
                .is_some_and(|bound| bound.eq_ignore_ascii_case(column))
    }
}

/// Constraints resolved to `(table, column)` once per request and shared by
/// generation and validation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConstraintBinding {
    bound: Vec<BoundConstraint>,
    unresolved: Vec<Constraint>,
}

impl ConstraintBinding {
    /// Bind every constraint in `set` to one of `tables` (catalog spelling, in
    /// generation order). Aliased targets resolve through the alias map and
    /// then naming heuristics; unaliased targets bind to every query table
    /// owning the column, falling back to every required table owning it.
    pub fn build(set: &ConstraintSet, tables: &[String], catalog: &SchemaCatalog) -> Self {
        let mut binding = Self::default();
        let binder = Binder {
            set,
            tables,
            catalog,
        };

        for constraint in set.iter() {
            let bound = binder.bind(constraint);
            if bound.is_empty() {
                debug!(
                    kind = %constraint.kind(),
                    source = constraint.source(),
                    "constraint left unbound"
                );
                binding.unresolved.push(constraint.clone());
            }
            binding.bound.extend(bound);
        }

        binding
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundConstraint> {
        self.bound.iter()
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn unresolved(&self) -> &[Constraint] {
        &self.unresolved
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a BoundConstraint> {
        self.bound
            .iter()
            .filter(move |bound| bound.table.eq_ignore_ascii_case(table))
    }

    pub fn for_column<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
    ) -> impl Iterator<Item = &'a BoundConstraint> {
        self.bound
            .iter()
            .filter(move |bound| bound.targets(table, column))
    }
}

struct Binder<'a> {
    set: &'a ConstraintSet,
    tables: &'a [String],
    catalog: &'a SchemaCatalog,
}

impl Binder<'_> {
    fn bind(&self, constraint: &Constraint) -> Vec<BoundConstraint> {
        match constraint {
            Constraint::Exists { table, .. } => table
                .as_deref()
                .and_then(|name| self.table_named(name))
                .map(|table| {
                    vec![BoundConstraint {
                        constraint: constraint.clone(),
                        table,
                        column: None,
                        peer: None,
                    }]
                })
                .unwrap_or_default(),
            Constraint::Join {
                condition:
                    JoinCondition::Equi {
                        left,
                        right,
                        right_table,
                    },
                ..
            } => {
                let left_table = self.resolve(left);
                let right_table = right_table
                    .as_deref()
                    .and_then(|name| self.table_named(name))
                    .or_else(|| self.resolve(right));
                match (left_table, right_table) {
                    (Some(left_table), Some(right_table)) => vec![BoundConstraint {
                        constraint: constraint.clone(),
                        column: Some(self.column_name(&left_table, &left.column)),
                        table: left_table,
                        peer: Some(JoinPeer {
                            column: self.column_name(&right_table, &right.column),
                            table: right_table,
                        }),
                    }],
                    _ => Vec::new(),
                }
            }
            other => {
                let Some(target) = other.target() else {
                    return Vec::new();
                };
                self.target_tables(target)
                    .into_iter()
                    .map(|table| BoundConstraint {
                        constraint: other.clone(),
                        column: Some(self.column_name(&table, &target.column)),
                        table,
                        peer: None,
                    })
                    .collect()
            }
        }
    }

    fn resolve(&self, target: &ColumnRef) -> Option<String> {
        resolve_alias(&target.alias, &self.set.aliases, self.tables).map(str::to_string)
    }

    fn target_tables(&self, target: &ColumnRef) -> Vec<String> {
        if target.has_alias() {
            return self.resolve(target).into_iter().collect();
        }

        let owns = |table: &&String| {
            self.catalog
                .table(table)
                .is_some_and(|found| found.has_column(&target.column))
        };
        let named: Vec<String> = self
            .tables
            .iter()
            .filter(|table| {
                self.set
                    .aliases
                    .tables()
                    .iter()
                    .any(|named| named.eq_ignore_ascii_case(table))
            })
            .filter(owns)
            .cloned()
            .collect();
        if !named.is_empty() {
            return named;
        }
        self.tables.iter().filter(owns).cloned().collect()
    }

    fn table_named(&self, name: &str) -> Option<String> {
        let name = sqlseed_core::unqualified(name);
        self.tables
            .iter()
            .find(|table| table.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn column_name(&self, table: &str, column: &str) -> String {
        self.catalog
            .table(table)
            .and_then(|found| found.column(column))
            .map(|found| found.name.clone())
            .unwrap_or_else(|| column.to_string())
    }
}
