use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::{Regex, RegexBuilder};
use sqlseed_core::{DataKind, SchemaCatalog, Table};
use sqlseed_generate::{DecodedRow, GeneratedValue, InsertStatement, LiteralCodec};
use sqlseed_query::{
    BoundConstraint, CompareOp, Constraint, ConstraintBinding, DateCondition, InList,
    IntervalDirection, IntervalUnit, JoinCondition,
};
use tracing::{debug, info};

use crate::errors::EvalError;
use crate::model::{Severity, ValidationReport, Violation};

const SECONDS_PER_DAY: i64 = 86_400;

/// Re-reads emitted statements and scores them against the bound constraints.
pub struct Validator<'a> {
    catalog: &'a SchemaCatalog,
    binding: &'a ConstraintBinding,
    codec: &'a LiteralCodec<'a>,
    reference_date: NaiveDate,
}

impl<'a> Validator<'a> {
    pub fn new(
        catalog: &'a SchemaCatalog,
        binding: &'a ConstraintBinding,
        codec: &'a LiteralCodec<'a>,
        reference_date: NaiveDate,
    ) -> Self {
        Self {
            catalog,
            binding,
            codec,
            reference_date,
        }
    }

    pub fn validate(&self, statements: &[InsertStatement]) -> Result<ValidationReport, EvalError> {
        let rows = self.decode_all(statements)?;
        let mut report = ValidationReport::default();

        for bound in self.binding.iter() {
            self.check(bound, &rows, &mut report);
        }
        for constraint in self.binding.unresolved() {
            report.record_not_evaluated(Violation {
                kind: constraint.kind(),
                table: String::new(),
                column: constraint.target().map(|target| target.column.clone()),
                expected: constraint.source().to_string(),
                actual: "no table in the query owns this column".to_string(),
                severity: Severity::Warning,
            });
        }

        info!(
            total = report.total_checks,
            passed = report.passed_checks,
            not_evaluated = report.not_evaluated,
            pass_rate = report.pass_rate(),
            "validation finished"
        );
        Ok(report)
    }

    fn decode_all(&self, statements: &[InsertStatement]) -> Result<TableRows, EvalError> {
        let mut rows = TableRows::default();
        for statement in statements {
            let DecodedRow { table, record } = self.codec.decode(&statement.sql, self.catalog)?;
            rows.by_table
                .entry(table.to_lowercase())
                .or_default()
                .push(record);
        }
        Ok(rows)
    }

    fn check(&self, bound: &BoundConstraint, rows: &TableRows, report: &mut ValidationReport) {
        let constraint = &bound.constraint;
        let kind = constraint.kind();
        let violation = |column: Option<&str>, actual: String| Violation {
            kind,
            table: bound.table.clone(),
            column: column.map(str::to_string),
            expected: constraint.source().to_string(),
            actual,
            severity: Severity::Error,
        };

        match constraint {
            Constraint::Exists { is_exists: true, .. } => {
                let count = rows.count(&bound.table);
                if count > 0 {
                    report.record_pass(kind);
                } else {
                    report.record_failure(violation(None, "no rows".to_string()));
                }
                return;
            }
            Constraint::Exists { is_exists: false, .. } => {
                report.record_not_evaluated(violation(None, "NOT EXISTS is not evaluated".to_string()));
                return;
            }
            Constraint::In {
                list: InList::Subquery { .. },
                ..
            } => {
                report.record_not_evaluated(violation(
                    bound.column.as_deref(),
                    "subquery IN is not evaluated".to_string(),
                ));
                return;
            }
            _ => {}
        }

        let Some(column_name) = bound.column.as_deref() else {
            return;
        };
        let Some(table) = self.catalog.table(&bound.table) else {
            report.record_failure(violation(Some(column_name), "table not in catalog".to_string()));
            return;
        };
        let Some(column) = table.column(column_name) else {
            report.record_failure(violation(Some(column_name), "column not in catalog".to_string()));
            return;
        };
        let data_kind = column.data_kind();

        // Generated keys are dense row numbers.
        if table.is_primary_key(column_name)
            && !table.is_foreign_key(column_name)
            && constrains_value(constraint)
        {
            report.record_not_evaluated(violation(
                Some(column_name),
                "primary keys are dense row numbers".to_string(),
            ));
            return;
        }

        let like = match constraint {
            Constraint::Like { pattern, .. } => like_regex(pattern),
            _ => None,
        };
        let peer_values = match (constraint, &bound.peer) {
            (
                Constraint::Join {
                    condition: JoinCondition::Equi { .. },
                    ..
                },
                Some(peer),
            ) => Some(rows.column_keys(self.catalog, &peer.table, &peer.column)),
            _ => None,
        };

        let values = rows.column_values(table, column_name);
        if values.is_empty() {
            debug!(table = %bound.table, column = column_name, "no rows to check");
        }
        for value in values {
            let Some(value) = value else {
                report.record_failure(violation(Some(column_name), "column missing from statement".to_string()));
                continue;
            };
            let passed = match constraint {
                Constraint::Where { op, value: literal, .. }
                | Constraint::Join {
                    condition: JoinCondition::Filter { op, value: literal, .. },
                    ..
                } => compares(&value, *op, literal, data_kind),
                Constraint::Join {
                    condition: JoinCondition::Equi { .. },
                    ..
                } => peer_values
                    .as_ref()
                    .is_some_and(|keys| !value.is_null() && keys.contains(&value.to_string())),
                Constraint::Like { .. } => match (&like, value.as_str()) {
                    (Some(regex), Some(text)) => regex.is_match(text),
                    (Some(regex), None) => !value.is_null() && regex.is_match(&value.to_string()),
                    (None, _) => false,
                },
                Constraint::Between { min, max, .. } => {
                    compares(&value, CompareOp::Ge, min, data_kind)
                        && compares(&value, CompareOp::Le, max, data_kind)
                }
                Constraint::In { list, negated, .. } => {
                    let member = list
                        .values()
                        .iter()
                        .any(|literal| compares(&value, CompareOp::Eq, literal, data_kind));
                    !value.is_null() && member != *negated
                }
                Constraint::Null { is_null, .. } => value.is_null() == *is_null,
                Constraint::Date { condition, op, .. } => self.date_holds(&value, condition, *op),
                Constraint::Boolean { value: expected, .. } => value.as_bool() == Some(*expected),
                Constraint::Exists { .. } => true,
            };

            if passed {
                report.record_pass(kind);
            } else {
                report.record_failure(violation(Some(column_name), value.to_string()));
            }
        }
    }

    fn date_holds(&self, value: &GeneratedValue, condition: &DateCondition, op: CompareOp) -> bool {
        match condition {
            DateCondition::YearEquals { year } => value
                .as_date()
                .is_some_and(|date| op.holds(date.year().cmp(year))),
            DateCondition::Interval {
                amount,
                unit,
                direction,
            } => {
                let Some(actual) = value.as_timestamp() else {
                    return false;
                };
                let now = self.reference_date.and_time(NaiveTime::MIN).and_utc().timestamp();
                let offset = amount.saturating_mul(unit_seconds(*unit));
                let target = match direction {
                    IntervalDirection::Past => now - offset,
                    IntervalDirection::Future => now + offset,
                };
                op.holds(actual.and_utc().timestamp().cmp(&target))
            }
        }
    }
}

#[derive(Debug, Default)]
struct TableRows {
    by_table: BTreeMap<String, Vec<sqlseed_generate::Record>>,
}

impl TableRows {
    fn rows(&self, table: &str) -> &[sqlseed_generate::Record] {
        self.by_table
            .get(&table.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Values of `column` per row. Identity columns left out of the
    /// statements are the implicit row numbers `1..=count`.
    fn column_values(&self, table: &Table, column: &str) -> Vec<Option<GeneratedValue>> {
        let implicit = table.column(column).is_some_and(|found| found.is_identity());
        self.rows(&table.name)
            .iter()
            .enumerate()
            .map(|(idx, record)| match record.get(column) {
                Some(value) => Some(value.clone()),
                None if implicit => Some(GeneratedValue::Int(idx as i64 + 1)),
                None => None,
            })
            .collect()
    }

    fn column_keys(&self, catalog: &SchemaCatalog, table: &str, column: &str) -> HashSet<String> {
        let Some(table) = catalog.table(table) else {
            return HashSet::new();
        };
        self.column_values(table, column)
            .into_iter()
            .flatten()
            .filter(|value| !value.is_null())
            .map(|value| value.to_string())
            .collect()
    }
}

/// Predicates that pin a column to literal values.
fn constrains_value(constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Join { condition, .. } => matches!(condition, JoinCondition::Filter { .. }),
        Constraint::Null { .. } | Constraint::Exists { .. } => false,
        _ => true,
    }
}

fn compares(value: &GeneratedValue, op: CompareOp, literal: &str, kind: DataKind) -> bool {
    if value.is_null() {
        return false;
    }
    match value.compare_literal(literal, kind) {
        Some(ordering) => op.holds(ordering),
        None => op == CompareOp::NotEq && value.to_string() != literal,
    }
}

/// Case-insensitive anchored regex for a LIKE pattern.
pub fn like_regex(pattern: &str) -> Option<Regex> {
    let mut expression = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');
    RegexBuilder::new(&expression)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()
}

fn unit_seconds(unit: IntervalUnit) -> i64 {
    match unit {
        IntervalUnit::Hour => 3_600,
        other => other.days() * SECONDS_PER_DAY,
    }
}
