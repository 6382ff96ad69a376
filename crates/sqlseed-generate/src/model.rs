use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::value::GeneratedValue;

/// Target SQL dialect for rendered literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Mysql,
    Oracle,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(GenerationError::InvalidOptions(format!(
                "unsupported dialect '{other}'"
            ))),
        }
    }
}

/// Options for the coordinated generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Rows per required table.
    pub rows: usize,
    pub dialect: Dialect,
    /// Emit identity columns, filled with the row index.
    pub preserve_ids: bool,
    /// Anchor for `NOW()`-relative date constraints and default date ranges.
    pub reference_date: NaiveDate,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            rows: 10,
            dialect: Dialect::default(),
            preserve_ids: false,
            reference_date: chrono::Utc::now().date_naive(),
        }
    }
}

/// Ordered column → value mapping for one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: Vec<(String, GeneratedValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an existing value with the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: GeneratedValue) {
        let column = column.into();
        match self
            .values
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
        {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&GeneratedValue> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One generation unit: row `index` of every required table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// 1-based row index.
    pub index: usize,
    pub records: BTreeMap<String, Record>,
}

impl RecordSet {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            records: BTreeMap::new(),
        }
    }

    pub fn record(&self, table: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, record)| record)
    }
}

/// A rendered INSERT; `priority` is the table's FK count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub sql: String,
    pub priority: usize,
}

/// Row recovered from an INSERT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRow {
    pub table: String,
    pub record: Record,
}
