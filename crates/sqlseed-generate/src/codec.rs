//! Inverse INSERT encoding and decoding.
//!
//! `decode(encode(record)) == record` for every value the generator
//! produces, with one documented exception: Oracle stores `''` as NULL.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlseed_core::{Column, DataKind, SchemaCatalog, Table};

use crate::errors::GenerationError;
use crate::model::{DecodedRow, Dialect, InsertStatement, Record};
use crate::value::{GeneratedValue, parse_bool, parse_date, parse_time, parse_timestamp};

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*INSERT\s+INTO\s+(?P<table>[^\s(]+)\s*\((?P<columns>[^)]*)\)\s*VALUES\s*\((?P<values>.*)\)\s*;?\s*$")
        .expect("valid INSERT regex")
});

static SIMPLE_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static WRAPPED_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:TO_DATE|TO_TIMESTAMP)\s*\(\s*('(?:[^']|'')*')\s*(?:,.*)?\)$")
        .expect("valid wrapped literal regex")
});

const IDENTIFIER_KEYWORDS: &[&str] = &[
    "order", "group", "user", "select", "table", "from", "where", "key", "index", "date",
    "level", "comment", "size", "type",
];

/// Dialect-specific literal and identifier rendering.
pub trait DialectFormatter {
    fn dialect(&self) -> Dialect;

    /// SQL literal for `value` stored in `column`.
    fn format_value(&self, value: &GeneratedValue, column: &Column) -> String;

    fn escape_identifier(&self, name: &str) -> String;

    /// Inverse of `format_value`.
    fn parse_literal(&self, literal: &str, column: &Column) -> Result<GeneratedValue, GenerationError>;
}

/// Built-in formatter for MySQL, Oracle and PostgreSQL.
#[derive(Debug, Clone, Copy)]
pub struct StandardFormatter {
    dialect: Dialect,
}

impl StandardFormatter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn quote(&self, text: &str) -> String {
        let mut escaped = text.replace('\'', "''");
        if self.dialect == Dialect::Mysql {
            escaped = escaped.replace('\\', "\\\\");
        }
        format!("'{escaped}'")
    }

    fn unquote(&self, literal: &str) -> Result<String, GenerationError> {
        let inner = literal
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
            .ok_or_else(|| GenerationError::Decode(format!("malformed string literal: {literal}")))?;

        if self.dialect != Dialect::Mysql {
            return Ok(inner.replace("''", "'"));
        }

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('0') => out.push('\0'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    out.push('\'');
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    /// Native TRUE/FALSE only for declared boolean columns outside Oracle.
    fn native_booleans(&self, column: &Column) -> bool {
        self.dialect != Dialect::Oracle
            && matches!(column.column_type.base_name().as_str(), "boolean" | "bool")
    }
}

impl DialectFormatter for StandardFormatter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn format_value(&self, value: &GeneratedValue, column: &Column) -> String {
        match value {
            GeneratedValue::Null => "NULL".to_string(),
            GeneratedValue::Bool(flag) => {
                if self.native_booleans(column) {
                    if *flag { "TRUE" } else { "FALSE" }.to_string()
                } else {
                    if *flag { "1" } else { "0" }.to_string()
                }
            }
            GeneratedValue::Int(number) => number.to_string(),
            GeneratedValue::Float(number) => match column.column_type.scale() {
                Some(scale) => {
                    let scale = scale.max(0) as usize;
                    format!("{number:.scale$}")
                }
                None => number.to_string(),
            },
            GeneratedValue::Text(text) => {
                if text.is_empty() && self.dialect == Dialect::Oracle {
                    "NULL".to_string()
                } else {
                    self.quote(text)
                }
            }
            GeneratedValue::Uuid(text) => self.quote(text),
            GeneratedValue::Date(date) => {
                let literal = self.quote(&date.format("%Y-%m-%d").to_string());
                if self.dialect == Dialect::Oracle {
                    format!("TO_DATE({literal}, 'YYYY-MM-DD')")
                } else {
                    literal
                }
            }
            GeneratedValue::Timestamp(timestamp) => {
                let literal = self.quote(&timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
                if self.dialect == Dialect::Oracle {
                    format!("TO_TIMESTAMP({literal}, 'YYYY-MM-DD HH24:MI:SS')")
                } else {
                    literal
                }
            }
            GeneratedValue::Time(time) => self.quote(&time.format("%H:%M:%S").to_string()),
            GeneratedValue::Json(json) => self.quote(&json.to_string()),
        }
    }

    fn escape_identifier(&self, name: &str) -> String {
        let plain = SIMPLE_IDENT_RE.is_match(name)
            && !IDENTIFIER_KEYWORDS
                .iter()
                .any(|keyword| keyword.eq_ignore_ascii_case(name));
        if plain {
            return name.to_string();
        }
        match self.dialect {
            Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
            Dialect::Oracle | Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    fn parse_literal(&self, literal: &str, column: &Column) -> Result<GeneratedValue, GenerationError> {
        let literal = literal.trim();
        if literal.eq_ignore_ascii_case("null") {
            return Ok(GeneratedValue::Null);
        }

        let quoted = if let Some(caps) = WRAPPED_LITERAL_RE.captures(literal) {
            caps.get(1).map(|m| m.as_str()).unwrap_or(literal)
        } else {
            literal
        };

        let kind = column.data_kind();
        if quoted.starts_with('\'') {
            let text = self.unquote(quoted)?;
            return typed_from_text(&text, kind, column);
        }

        match kind {
            DataKind::Boolean => parse_bool(quoted)
                .map(GeneratedValue::Bool)
                .ok_or_else(|| decode_error(column, literal)),
            DataKind::Integer => quoted
                .parse::<i64>()
                .map(GeneratedValue::Int)
                .map_err(|_| decode_error(column, literal)),
            DataKind::Decimal | DataKind::Float => quoted
                .parse::<f64>()
                .map(GeneratedValue::Float)
                .map_err(|_| decode_error(column, literal)),
            _ => {
                if let Some(flag) = parse_bool(quoted).filter(|_| {
                    quoted.eq_ignore_ascii_case("true") || quoted.eq_ignore_ascii_case("false")
                }) {
                    return Ok(GeneratedValue::Bool(flag));
                }
                Ok(GeneratedValue::Text(quoted.to_string()))
            }
        }
    }
}

fn typed_from_text(text: &str, kind: DataKind, column: &Column) -> Result<GeneratedValue, GenerationError> {
    let value = match kind {
        DataKind::Date => parse_date(text).map(GeneratedValue::Date),
        DataKind::Timestamp => parse_timestamp(text).map(GeneratedValue::Timestamp),
        DataKind::Time => parse_time(text).map(GeneratedValue::Time),
        DataKind::Uuid => Some(GeneratedValue::Uuid(text.to_string())),
        DataKind::Json => Some(
            serde_json::from_str(text)
                .map(GeneratedValue::Json)
                .unwrap_or_else(|_| GeneratedValue::Text(text.to_string())),
        ),
        DataKind::Boolean => parse_bool(text).map(GeneratedValue::Bool),
        DataKind::Integer => text.trim().parse().ok().map(GeneratedValue::Int),
        DataKind::Decimal | DataKind::Float => text.trim().parse().ok().map(GeneratedValue::Float),
        DataKind::Text => Some(GeneratedValue::Text(text.to_string())),
    };
    // Quoted values that do not fit the declared type survive as text.
    Ok(value.unwrap_or_else(|| {
        tracing::debug!(column = %column.name, value = text, "literal kept as text");
        GeneratedValue::Text(text.to_string())
    }))
}

fn decode_error(column: &Column, literal: &str) -> GenerationError {
    GenerationError::Decode(format!(
        "literal {literal} does not fit column {} ({})",
        column.name, column.column_type.data_type
    ))
}

/// Encodes records as INSERT statements and decodes them back.
pub struct LiteralCodec<'a> {
    formatter: &'a dyn DialectFormatter,
}

impl<'a> LiteralCodec<'a> {
    pub fn new(formatter: &'a dyn DialectFormatter) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &dyn DialectFormatter {
        self.formatter
    }

    pub fn encode(&self, table: &Table, record: &Record) -> Result<InsertStatement, GenerationError> {
        let mut columns = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (name, value) in record.iter() {
            let column = table.column(name).ok_or_else(|| {
                GenerationError::Decode(format!("column {}.{name} not in catalog", table.name))
            })?;
            columns.push(self.formatter.escape_identifier(&column.name));
            values.push(self.formatter.format_value(value, column));
        }

        Ok(InsertStatement {
            table: table.name.clone(),
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.formatter.escape_identifier(&table.name),
                columns.join(", "),
                values.join(", ")
            ),
            priority: table.fk_count(),
        })
    }

    pub fn decode(&self, sql: &str, catalog: &SchemaCatalog) -> Result<DecodedRow, GenerationError> {
        let caps = INSERT_RE
            .captures(sql)
            .ok_or_else(|| GenerationError::Decode(format!("not an INSERT statement: {sql}")))?;
        let table_name = caps.name("table").map(|m| m.as_str()).unwrap_or_default();
        let table = catalog
            .table(strip_identifier(table_name))
            .ok_or_else(|| GenerationError::UnknownTable(table_name.to_string()))?;

        let columns: Vec<&str> = caps
            .name("columns")
            .map(|m| m.as_str().split(',').map(strip_identifier).collect())
            .unwrap_or_default();
        let values = split_values(
            caps.name("values").map(|m| m.as_str()).unwrap_or_default(),
            self.formatter.dialect() == Dialect::Mysql,
        );
        if columns.len() != values.len() {
            return Err(GenerationError::Decode(format!(
                "{} columns but {} values in INSERT INTO {}",
                columns.len(),
                values.len(),
                table.name
            )));
        }

        let mut record = Record::new();
        for (name, literal) in columns.into_iter().zip(values) {
            let column = table.column(name).ok_or_else(|| {
                GenerationError::Decode(format!("column {}.{name} not in catalog", table.name))
            })?;
            record.insert(column.name.clone(), self.formatter.parse_literal(literal, column)?);
        }

        Ok(DecodedRow {
            table: table.name.clone(),
            record,
        })
    }
}

fn strip_identifier(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.rsplit('.').next().unwrap_or(raw);
    raw.trim_matches(|c| c == '`' || c == '"')
}

/// Split a VALUES list on top-level commas, honoring quotes and parentheses.
fn split_values(text: &str, backslash_escapes: bool) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut in_quote = false;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if in_quote {
            if backslash_escapes && byte == b'\\' {
                idx += 2;
                continue;
            }
            if byte == b'\'' {
                if bytes.get(idx + 1) == Some(&b'\'') {
                    idx += 2;
                    continue;
                }
                in_quote = false;
            }
            idx += 1;
            continue;
        }
        match byte {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_values_respects_quotes_and_calls() {
        let parts = split_values(
            "1, 'a, b', TO_DATE('2024-01-01', 'YYYY-MM-DD'), 'it''s', NULL",
            false,
        );
        assert_eq!(
            parts,
            vec!["1", "'a, b'", "TO_DATE('2024-01-01', 'YYYY-MM-DD')", "'it''s'", "NULL"]
        );
    }

    #[test]
    fn mysql_backslashes_round_trip() {
        let formatter = StandardFormatter::new(Dialect::Mysql);
        let quoted = formatter.quote(r"C:\temp\it's");
        assert_eq!(quoted, r"'C:\\temp\\it''s'");
        assert_eq!(formatter.unquote(&quoted).expect("unquote"), r"C:\temp\it's");
    }

    #[test]
    fn keywords_and_odd_names_are_quoted() {
        let mysql = StandardFormatter::new(Dialect::Mysql);
        let postgres = StandardFormatter::new(Dialect::Postgres);
        assert_eq!(mysql.escape_identifier("users"), "users");
        assert_eq!(mysql.escape_identifier("order"), "`order`");
        assert_eq!(postgres.escape_identifier("user"), "\"user\"");
        assert_eq!(postgres.escape_identifier("first name"), "\"first name\"");
    }
}
