use std::collections::HashMap;

use rand::RngCore;
use rand::seq::IndexedRandom;
use sqlseed_core::{Column, DataKind, ForeignKey, SchemaCatalog, Table};
use sqlseed_query::{BoundConstraint, CompareOp, Constraint, ConstraintBinding, JoinCondition};
use tracing::{debug, info};

use crate::errors::GenerationError;
use crate::junction::{JunctionKeys, JunctionLayout};
use crate::model::{GenerateOptions, Record, RecordSet};
use crate::resolver::Resolution;
use crate::synth::{ValueSynthesizer, truncate_chars};
use crate::value::GeneratedValue;

/// Insert plan for one required table.
#[derive(Debug)]
struct TablePlan<'a> {
    table: &'a Table,
    columns: Vec<&'a Column>,
    junction: Option<JunctionLayout>,
}

/// Generates cross-table records that satisfy the bound constraints while
/// keeping primary and foreign keys consistent.
///
/// Row `i` of every table is produced together, parents first. Non-junction
/// primary keys are the dense row index and every FK points at a parent row
/// that exists in the same batch.
#[derive(Debug)]
pub struct CoordinatedGenerator<'a> {
    catalog: &'a SchemaCatalog,
    binding: &'a ConstraintBinding,
    options: GenerateOptions,
    synthesizer: ValueSynthesizer,
    plans: Vec<TablePlan<'a>>,
}

impl<'a> CoordinatedGenerator<'a> {
    /// Build per-table insert plans in generation order.
    ///
    /// Fails with `NoInsertableColumns` when a table has nothing left to insert
    /// after generated and identity columns are removed.
    pub fn new(
        catalog: &'a SchemaCatalog,
        binding: &'a ConstraintBinding,
        resolution: &Resolution,
        options: GenerateOptions,
    ) -> Result<Self, GenerationError> {
        if options.rows == 0 {
            return Err(GenerationError::InvalidOptions(
                "rows must be at least 1".to_string(),
            ));
        }

        let mut plans = Vec::with_capacity(resolution.generation_order.len());
        for name in &resolution.generation_order {
            let table = catalog
                .table(name)
                .ok_or_else(|| GenerationError::UnknownTable(name.clone()))?;
            let columns: Vec<&Column> = table
                .ordered_columns()
                .into_iter()
                .filter(|column| {
                    !column.is_generated() && (!column.is_identity() || options.preserve_ids)
                })
                .collect();
            if columns.is_empty() {
                return Err(GenerationError::NoInsertableColumns {
                    table: table.name.clone(),
                });
            }

            let junction = JunctionLayout::detect(table);
            debug!(
                table = %table.name,
                columns = columns.len(),
                junction = junction.is_some(),
                constraints = binding.for_table(&table.name).count(),
                "table plan ready"
            );
            plans.push(TablePlan {
                table,
                columns,
                junction,
            });
        }

        Ok(Self {
            catalog,
            binding,
            synthesizer: ValueSynthesizer::new(options.reference_date),
            options,
            plans,
        })
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Tables in the order rows are produced.
    pub fn table_order(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|plan| plan.table.name.as_str())
    }

    /// Insertable column names of `table`, in statement order.
    pub fn insert_columns(&self, table: &str) -> Option<Vec<&str>> {
        self.plans
            .iter()
            .find(|plan| plan.table.name.eq_ignore_ascii_case(table))
            .map(|plan| plan.columns.iter().map(|column| column.name.as_str()).collect())
    }

    /// Produce `options.rows` record sets.
    pub fn generate(&self, rng: &mut dyn RngCore) -> Result<Vec<RecordSet>, GenerationError> {
        let rows = self.options.rows;
        info!(
            rows,
            tables = self.plans.len(),
            constraints = self.binding.len(),
            "coordinated generation started"
        );

        let mut junction_keys: HashMap<String, JunctionKeys> = HashMap::new();
        let mut sets = Vec::with_capacity(rows);
        for index in 1..=rows {
            let mut set = RecordSet::new(index);
            for plan in &self.plans {
                let record = self.generate_record(plan, index, &set, &mut junction_keys, rng);
                set.records.insert(plan.table.name.clone(), record);
            }
            sets.push(set);
        }

        info!(
            rows,
            records = sets.len() * self.plans.len(),
            "coordinated generation finished"
        );
        Ok(sets)
    }

    fn generate_record(
        &self,
        plan: &TablePlan<'_>,
        index: usize,
        set: &RecordSet,
        junction_keys: &mut HashMap<String, JunctionKeys>,
        rng: &mut dyn RngCore,
    ) -> Record {
        let junction_values = plan.junction.as_ref().map(|layout| {
            let rows = self.options.rows as i64;
            let pinned: Vec<Option<i64>> = layout
                .columns
                .iter()
                .map(|name| {
                    let bound: Vec<&BoundConstraint> =
                        self.binding.for_column(&plan.table.name, name).collect();
                    pinned_key(&bound, rows, &mut *rng)
                })
                .collect();
            junction_keys
                .entry(plan.table.name.clone())
                .or_default()
                .next(layout, index, self.options.rows, &pinned)
        });

        let mut record = Record::new();
        for column in &plan.columns {
            let value = self.column_value(plan, column, index, set, junction_values.as_deref(), rng);
            record.insert(column.name.clone(), value);
        }
        record
    }

    fn column_value(
        &self,
        plan: &TablePlan<'_>,
        column: &Column,
        index: usize,
        set: &RecordSet,
        junction_values: Option<&[i64]>,
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        let table = plan.table;
        if column.is_identity() {
            return GeneratedValue::Int(index as i64);
        }

        if let (Some(layout), Some(values)) = (&plan.junction, junction_values)
            && let Some(position) = layout
                .columns
                .iter()
                .position(|name| name.eq_ignore_ascii_case(&column.name))
        {
            let value = values[position];
            return match table.foreign_key_for(&column.name) {
                Some(fk) => self.referenced_key(fk, &column.name, value),
                None => GeneratedValue::Int(value),
            };
        }

        let bound: Vec<&BoundConstraint> =
            self.binding.for_column(&table.name, &column.name).collect();

        if let Some(fk) = table.foreign_key_for(&column.name) {
            return self.foreign_key_value(table, column, fk, index, &bound, rng);
        }

        // Key columns stay dense and ignore value constraints.
        if table.is_primary_key(&column.name) {
            return key_value(table, column, index as i64);
        }

        if let Some(value) = self.joined_value(table, column, set) {
            return value;
        }

        self.synthesizer
            .synthesize(table, column, index, &bound, rng)
    }

    fn foreign_key_value(
        &self,
        table: &Table,
        column: &Column,
        fk: &ForeignKey,
        index: usize,
        bound: &[&BoundConstraint],
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        let rows = self.options.rows as i64;
        let index = index as i64;

        if column.is_nullable
            && bound
                .iter()
                .any(|b| matches!(b.constraint, Constraint::Null { is_null: true, .. }))
        {
            return GeneratedValue::Null;
        }

        if fk.referenced_table.eq_ignore_ascii_case(&table.name) {
            // Self reference: point at the previous row.
            if index == 1 {
                if column.is_nullable {
                    return GeneratedValue::Null;
                }
                return self.referenced_key(fk, &column.name, 1);
            }
            return self.referenced_key(fk, &column.name, index - 1);
        }

        let target = pinned_key(bound, rows, rng).unwrap_or((index - 1).rem_euclid(rows) + 1);
        self.referenced_key(fk, &column.name, target)
    }

    /// Key value `row` in the type of the referenced column.
    fn referenced_key(&self, fk: &ForeignKey, column: &str, row: i64) -> GeneratedValue {
        let parent = self.catalog.table(&fk.referenced_table);
        let referenced = parent.and_then(|parent| {
            fk.referenced_column_for(column)
                .and_then(|name| parent.column(name))
        });
        match (parent, referenced) {
            (Some(parent), Some(referenced)) => key_value(parent, referenced, row),
            _ => GeneratedValue::Int(row),
        }
    }

    /// Value copied across an equi join from a record already in `set`.
    fn joined_value(&self, table: &Table, column: &Column, set: &RecordSet) -> Option<GeneratedValue> {
        let forward = self
            .binding
            .for_column(&table.name, &column.name)
            .filter_map(|bound| bound.peer.as_ref())
            .find_map(|peer| set.record(&peer.table)?.get(&peer.column).cloned());
        if forward.is_some() {
            return forward;
        }

        self.binding
            .iter()
            .filter(|bound| {
                bound.peer.as_ref().is_some_and(|peer| {
                    peer.table.eq_ignore_ascii_case(&table.name)
                        && peer.column.eq_ignore_ascii_case(&column.name)
                })
            })
            .find_map(|bound| {
                let left = bound.column.as_deref()?;
                set.record(&bound.table)?.get(left).cloned()
            })
    }
}

/// Dense key for row `row`: integers as-is, UUIDs from the row number, text
/// as `<table>_<row>`, or the bare row number when that is too long.
pub fn key_value(table: &Table, column: &Column, row: i64) -> GeneratedValue {
    match column.data_kind() {
        DataKind::Uuid => {
            GeneratedValue::Uuid(uuid::Uuid::from_u128(row.max(0) as u128).to_string())
        }
        DataKind::Text => {
            let named = format!("{}_{row}", table.name);
            let text = match column.max_length() {
                Some(max) if named.chars().count() > max => {
                    truncate_chars(&row.to_string(), Some(max))
                }
                _ => named,
            };
            GeneratedValue::Text(text)
        }
        _ => GeneratedValue::Int(row),
    }
}

/// An `=` or IN literal naming an existing parent row.
fn pinned_key(bound: &[&BoundConstraint], rows: i64, rng: &mut dyn RngCore) -> Option<i64> {
    let in_range = |literal: &str| literal.trim().parse::<i64>().ok().filter(|value| (1..=rows).contains(value));

    for b in bound {
        match &b.constraint {
            Constraint::Where {
                op: CompareOp::Eq,
                value,
                ..
            }
            | Constraint::Join {
                condition:
                    JoinCondition::Filter {
                        op: CompareOp::Eq,
                        value,
                        ..
                    },
                ..
            } => {
                if let Some(key) = in_range(value.as_str()) {
                    return Some(key);
                }
            }
            Constraint::In {
                list,
                negated: false,
                ..
            } => {
                let keys: Vec<i64> = list.values().iter().filter_map(|value| in_range(value.as_str())).collect();
                if let Some(key) = keys.choose(rng) {
                    return Some(*key);
                }
            }
            _ => {}
        }
    }
    None
}
