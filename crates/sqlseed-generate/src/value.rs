use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlseed_core::DataKind;

/// Generated value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Json(serde_json::Value),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            GeneratedValue::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            GeneratedValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            GeneratedValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Truthiness for boolean-like storage: `1`/`0`, `TRUE`/`FALSE`, `t`/`f`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GeneratedValue::Bool(value) => Some(*value),
            GeneratedValue::Int(value) => Some(*value != 0),
            GeneratedValue::Float(value) => Some(*value != 0.0),
            GeneratedValue::Text(value) => parse_bool(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            GeneratedValue::Date(value) => Some(*value),
            GeneratedValue::Timestamp(value) => Some(value.date()),
            GeneratedValue::Text(value) => parse_date(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            GeneratedValue::Date(value) => value.and_hms_opt(0, 0, 0),
            GeneratedValue::Timestamp(value) => Some(*value),
            GeneratedValue::Text(value) => parse_timestamp(value),
            _ => None,
        }
    }

    /// Compare against a query literal, interpreting the literal by `kind`.
    pub fn compare_literal(&self, literal: &str, kind: DataKind) -> Option<Ordering> {
        match kind {
            DataKind::Integer | DataKind::Decimal | DataKind::Float => {
                let actual = self.as_f64()?;
                let expected = match boolean_keyword(literal) {
                    Some(flag) => f64::from(u8::from(flag)),
                    None => literal.trim().parse().ok()?,
                };
                actual.partial_cmp(&expected)
            }
            DataKind::Boolean => {
                let actual = self.as_bool()?;
                let expected = parse_bool(literal)?;
                Some(actual.cmp(&expected))
            }
            DataKind::Date => {
                let actual = self.as_date()?;
                let expected = parse_date(literal)?;
                Some(actual.cmp(&expected))
            }
            DataKind::Timestamp => {
                let actual = self.as_timestamp()?;
                let expected = parse_timestamp(literal)?;
                Some(actual.cmp(&expected))
            }
            DataKind::Time => match self {
                GeneratedValue::Time(actual) => {
                    let expected = parse_time(literal)?;
                    Some(actual.cmp(&expected))
                }
                _ => Some(self.to_string().as_str().cmp(literal)),
            },
            DataKind::Uuid | DataKind::Json | DataKind::Text => {
                if self.is_null() {
                    return None;
                }
                Some(self.to_string().as_str().cmp(literal))
            }
        }
    }
}

/// Plain rendering without SQL quoting.
impl fmt::Display for GeneratedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedValue::Null => f.write_str("NULL"),
            GeneratedValue::Bool(value) => write!(f, "{value}"),
            GeneratedValue::Int(value) => write!(f, "{value}"),
            GeneratedValue::Float(value) => write!(f, "{value}"),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => f.write_str(value),
            GeneratedValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            GeneratedValue::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
            GeneratedValue::Timestamp(value) => {
                write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S"))
            }
            GeneratedValue::Json(value) => write!(f, "{value}"),
        }
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// `TRUE`/`FALSE` keyword literal, any case.
pub fn boolean_keyword(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|value| value.date()))
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Round `value` to `scale` decimal places.
pub fn round_to_scale(value: f64, scale: u32) -> f64 {
    let factor = 10_f64.powi(scale as i32);
    (value * factor).round() / factor
}
