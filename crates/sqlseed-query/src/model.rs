use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column reference as written in the query; `alias` is empty when unqualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }

    pub fn has_alias(&self) -> bool {
        !self.alias.is_empty()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alias.is_empty() {
            write!(f, "{}", self.column)
        } else {
            write!(f, "{}.{}", self.alias, self.column)
        }
    }
}

/// Comparison operator; `<>` parses as `!=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl CompareOp {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Whether `actual.cmp(expected)` satisfies the operator.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }

    /// Operator seen from the other side: `a < b` is `b > a`.
    pub fn flip(&self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            other => *other,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeKind {
    Contains,
    StartsWith,
    EndsWith,
    Exact,
}

impl LikeKind {
    pub fn classify(pattern: &str) -> Self {
        let leading = pattern.starts_with('%');
        let trailing = pattern.len() > 1 && pattern.ends_with('%');
        match (leading, trailing) {
            (true, true) => Self::Contains,
            (true, false) => Self::EndsWith,
            (false, true) => Self::StartsWith,
            (false, false) => Self::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetweenKind {
    Numeric,
    Date,
    String,
}

impl BetweenKind {
    pub fn infer(min: &str, max: &str) -> Self {
        if looks_numeric(min) && looks_numeric(max) {
            Self::Numeric
        } else if looks_date(min) && looks_date(max) {
            Self::Date
        } else {
            Self::String
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InList {
    NumericList { values: Vec<String> },
    StringList { values: Vec<String> },
    Subquery { subquery: String },
}

impl InList {
    pub fn values(&self) -> &[String] {
        match self {
            Self::NumericList { values } | Self::StringList { values } => values,
            Self::Subquery { .. } => &[],
        }
    }

    pub fn is_subquery(&self) -> bool {
        matches!(self, Self::Subquery { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        match token.trim_end_matches('S') {
            "HOUR" => Some(Self::Hour),
            "DAY" => Some(Self::Day),
            "WEEK" => Some(Self::Week),
            "MONTH" => Some(Self::Month),
            "YEAR" => Some(Self::Year),
            _ => None,
        }
    }

    /// Approximate length in days, used to size date windows.
    pub fn days(&self) -> i64 {
        match self {
            Self::Hour => 0,
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
        }
    }
}

/// Direction of an interval relative to the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalDirection {
    Past,
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateCondition {
    YearEquals {
        year: i32,
    },
    /// `col op NOW() ± INTERVAL amount unit`; amount 0 is "now" itself.
    Interval {
        amount: i64,
        unit: IntervalUnit,
        direction: IntervalDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum JoinCondition {
    /// Column-to-column equality; `right_table` is the table joined on the right side.
    Equi {
        left: ColumnRef,
        right: ColumnRef,
        right_table: Option<String>,
    },
    /// `AND alias.col op value` mined from an ON clause.
    Filter {
        target: ColumnRef,
        op: CompareOp,
        value: String,
    },
}

/// One predicate mined from the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    Where {
        target: ColumnRef,
        op: CompareOp,
        value: String,
        source: String,
    },
    Join {
        condition: JoinCondition,
        source: String,
    },
    Like {
        target: ColumnRef,
        pattern: String,
        required_substring: String,
        kind: LikeKind,
        source: String,
    },
    Between {
        target: ColumnRef,
        min: String,
        max: String,
        data_kind: BetweenKind,
        source: String,
    },
    In {
        target: ColumnRef,
        list: InList,
        negated: bool,
        source: String,
    },
    Null {
        target: ColumnRef,
        is_null: bool,
        source: String,
    },
    Exists {
        is_exists: bool,
        subquery: String,
        table: Option<String>,
        source: String,
    },
    Date {
        target: ColumnRef,
        condition: DateCondition,
        op: CompareOp,
        source: String,
    },
    Boolean {
        target: ColumnRef,
        literal: String,
        value: bool,
        source: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Where,
    Join,
    Like,
    Between,
    In,
    Null,
    Exists,
    Date,
    Boolean,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Join => "join",
            Self::Like => "like",
            Self::Between => "between",
            Self::In => "in",
            Self::Null => "null",
            Self::Exists => "exists",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Where { .. } => ConstraintKind::Where,
            Self::Join { .. } => ConstraintKind::Join,
            Self::Like { .. } => ConstraintKind::Like,
            Self::Between { .. } => ConstraintKind::Between,
            Self::In { .. } => ConstraintKind::In,
            Self::Null { .. } => ConstraintKind::Null,
            Self::Exists { .. } => ConstraintKind::Exists,
            Self::Date { .. } => ConstraintKind::Date,
            Self::Boolean { .. } => ConstraintKind::Boolean,
        }
    }

    /// Column the constraint targets. Equi joins report their left side;
    /// EXISTS has no column target.
    pub fn target(&self) -> Option<&ColumnRef> {
        match self {
            Self::Where { target, .. }
            | Self::Like { target, .. }
            | Self::Between { target, .. }
            | Self::In { target, .. }
            | Self::Null { target, .. }
            | Self::Date { target, .. }
            | Self::Boolean { target, .. } => Some(target),
            Self::Join { condition, .. } => match condition {
                JoinCondition::Equi { left, .. } => Some(left),
                JoinCondition::Filter { target, .. } => Some(target),
            },
            Self::Exists { .. } => None,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Where { source, .. }
            | Self::Join { source, .. }
            | Self::Like { source, .. }
            | Self::Between { source, .. }
            | Self::In { source, .. }
            | Self::Null { source, .. }
            | Self::Exists { source, .. }
            | Self::Date { source, .. }
            | Self::Boolean { source, .. } => source,
        }
    }
}

/// Alias → table name (as written, unqualified) from FROM/JOIN clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMap {
    aliases: BTreeMap<String, String>,
    tables: Vec<String>,
}

impl AliasMap {
    /// Record a table reference. The table's own name always resolves to itself.
    pub fn insert(&mut self, table: &str, alias: Option<&str>) {
        if !self.tables.iter().any(|known| known.eq_ignore_ascii_case(table)) {
            self.tables.push(table.to_string());
        }
        self.aliases
            .entry(table.to_lowercase())
            .or_insert_with(|| table.to_string());
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_lowercase(), table.to_string());
        }
    }

    pub fn table_for(&self, alias: &str) -> Option<&str> {
        self.aliases.get(&alias.to_lowercase()).map(String::as_str)
    }

    /// Tables in order of first appearance.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, table)| (alias.as_str(), table.as_str()))
    }
}

/// Constraints mined from a single query, with its alias map and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub constraints: Vec<Constraint>,
    pub aliases: AliasMap,
    pub where_clause: Option<String>,
    /// SHA-256 of the normalized query text.
    pub fingerprint: String,
}

impl ConstraintSet {
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn of_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(move |constraint| constraint.kind() == kind)
    }

    pub fn kind_counts(&self) -> BTreeMap<ConstraintKind, usize> {
        let mut counts = BTreeMap::new();
        for constraint in &self.constraints {
            *counts.entry(constraint.kind()).or_insert(0) += 1;
        }
        counts
    }
}

pub(crate) fn looks_numeric(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && value.parse::<f64>().is_ok()
}

pub(crate) fn looks_date(value: &str) -> bool {
    let bytes = value.trim().as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}
