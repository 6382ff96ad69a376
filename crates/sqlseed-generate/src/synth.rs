//! Column value synthesis from bound constraints.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use sqlseed_core::{Column, DataKind, Table};
use sqlseed_query::{
    BetweenKind, BoundConstraint, CompareOp, Constraint, DateCondition, InList,
    IntervalDirection, IntervalUnit, JoinCondition, LikeKind,
};
use tracing::{debug, warn};

use crate::value::{
    GeneratedValue, boolean_keyword, parse_bool, parse_date, parse_time, parse_timestamp,
    round_to_scale,
};

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const REDRAW_LIMIT: usize = 10;
const SECONDS_PER_DAY: i64 = 86_400;
const STATUS_VALUES: &[&str] = &["active", "pending", "inactive"];

/// Builds one column value at a time from the constraints bound to it.
#[derive(Debug, Clone, Copy)]
pub struct ValueSynthesizer {
    reference_date: NaiveDate,
}

impl ValueSynthesizer {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Value for `column` of row `row` (1-based).
    ///
    /// Precedence: NULL, then equality (`=`, boolean literals, ON-clause
    /// `=` filters), IN, LIKE, ranges, and finally unconstrained synthesis.
    /// `!=` and NOT IN literals are honored by re-drawing.
    pub fn synthesize(
        &self,
        table: &Table,
        column: &Column,
        row: usize,
        constraints: &[&BoundConstraint],
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        let kind = column.data_kind();
        let mut excluded: Vec<&str> = Vec::new();
        let mut equality: Option<GeneratedValue> = None;
        let mut choices: Option<&[String]> = None;
        let mut like: Option<(&str, LikeKind)> = None;
        let mut range = RangeSpec::default();

        for bound in constraints {
            match &bound.constraint {
                Constraint::Null { is_null: true, .. } => {
                    if column.is_nullable {
                        return GeneratedValue::Null;
                    }
                    warn!(
                        table = %table.name,
                        column = %column.name,
                        "IS NULL on a NOT NULL column; synthesizing a value"
                    );
                }
                Constraint::Null { is_null: false, .. } => {}
                Constraint::Where { op, value, .. }
                | Constraint::Join {
                    condition: JoinCondition::Filter { op, value, .. },
                    ..
                } => match op {
                    CompareOp::Eq => {
                        equality.get_or_insert_with(|| match boolean_keyword(value) {
                            Some(flag) if kind != DataKind::Text => boolean_value(flag, kind),
                            _ => coerce_literal(value, column),
                        });
                    }
                    CompareOp::NotEq => excluded.push(value),
                    other => range.push_literal(*other, value, kind),
                },
                Constraint::Boolean { value, .. } => {
                    equality.get_or_insert_with(|| boolean_value(*value, kind));
                }
                Constraint::In { list, negated, .. } => match (list, negated) {
                    (InList::Subquery { .. }, _) => {}
                    (list, true) => excluded.extend(list.values().iter().map(String::as_str)),
                    (list, false) => {
                        if !list.values().is_empty() {
                            choices.get_or_insert(list.values());
                        }
                    }
                },
                Constraint::Like { pattern, kind: like_kind, .. } => {
                    like.get_or_insert((pattern.as_str(), *like_kind));
                }
                Constraint::Between { min, max, data_kind, .. } => {
                    if *data_kind == BetweenKind::String && !kind.is_numeric() && !kind.is_temporal() {
                        range.text_lower.get_or_insert_with(|| min.clone());
                        range.text_upper.get_or_insert_with(|| max.clone());
                    } else {
                        range.push_literal(CompareOp::Ge, min, kind);
                        range.push_literal(CompareOp::Le, max, kind);
                    }
                }
                Constraint::Date { condition, op, .. } => {
                    self.push_date_condition(&mut range, condition, *op);
                }
                Constraint::Join {
                    condition: JoinCondition::Equi { .. },
                    ..
                }
                | Constraint::Exists { .. } => {}
            }
        }

        let draw = |rng: &mut dyn RngCore| -> GeneratedValue {
            if let Some(value) = &equality {
                return value.clone();
            }
            if let Some(values) = choices
                && let Some(picked) = values.choose(rng)
            {
                return coerce_literal(picked, column);
            }
            if let Some((pattern, like_kind)) = like {
                return GeneratedValue::Text(like_value(pattern, like_kind, column, row, rng));
            }
            if !range.is_empty()
                && let Some(value) = self.sample_range(&range, column, row, rng)
            {
                return value;
            }
            self.unconstrained(table, column, row, rng)
        };

        let mut value = draw(&mut *rng);
        if excluded.is_empty() || equality.is_some() {
            return value;
        }
        for attempt in 0..REDRAW_LIMIT {
            if !is_excluded(&value, &excluded, kind) {
                return value;
            }
            debug!(column = %column.name, attempt, "value hit an excluded literal; redrawing");
            value = draw(&mut *rng);
        }
        if is_excluded(&value, &excluded, kind) {
            value = nudge(value, row);
        }
        value
    }

    /// Constraint-free value by declared type, then by column-name inference.
    pub fn unconstrained(
        &self,
        table: &Table,
        column: &Column,
        row: usize,
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        if column.is_enum()
            && let Some(label) = column.enum_values.choose(rng)
        {
            return GeneratedValue::Text(label.clone());
        }

        let name = column.name.to_lowercase();
        match column.data_kind() {
            DataKind::Integer => {
                let (low, high) = if name == "age" || name.ends_with("_age") {
                    (18, 90)
                } else if name.contains("year") {
                    (2000, i64::from(self.reference_date.year()))
                } else {
                    (1, integer_ceiling(column).min(1000))
                };
                GeneratedValue::Int(rng.random_range(low..=high.max(low)))
            }
            DataKind::Decimal => {
                let scale = column.column_type.scale().unwrap_or(2).max(0) as u32;
                let ceiling = decimal_ceiling(column).min(10_000.0);
                let raw = rng.random_range(1.0..=ceiling.max(1.0));
                GeneratedValue::Float(round_to_scale(raw, scale))
            }
            DataKind::Float => GeneratedValue::Float(round_to_scale(rng.random_range(0.0..1000.0), 2)),
            DataKind::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
            DataKind::Date => {
                let back = rng.random_range(0..=365);
                GeneratedValue::Date(self.reference_date - Duration::days(back))
            }
            DataKind::Timestamp => {
                let back = rng.random_range(0..=365 * SECONDS_PER_DAY);
                GeneratedValue::Timestamp(self.reference_instant() - Duration::seconds(back))
            }
            DataKind::Time => {
                let seconds = rng.random_range(0..SECONDS_PER_DAY as u32);
                GeneratedValue::Time(
                    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN),
                )
            }
            DataKind::Uuid => {
                let bytes: [u8; 16] = rng.random();
                GeneratedValue::Uuid(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
            }
            DataKind::Json => GeneratedValue::Json(serde_json::json!({ "row": row })),
            DataKind::Text => {
                let mut text = infer_text(&name, row, rng);
                if table.is_unique(&column.name) && !table.is_primary_key(&column.name) {
                    text = unique_text(&text, row, &name);
                }
                GeneratedValue::Text(truncate_chars(&text, column.max_length()))
            }
        }
    }

    fn reference_instant(&self) -> NaiveDateTime {
        self.reference_date.and_time(NaiveTime::MIN)
    }

    fn push_date_condition(&self, range: &mut RangeSpec, condition: &DateCondition, op: CompareOp) {
        match condition {
            DateCondition::YearEquals { year } => {
                let (Some(first), Some(last)) = (
                    NaiveDate::from_ymd_opt(*year, 1, 1),
                    NaiveDate::from_ymd_opt(*year, 12, 31),
                ) else {
                    return;
                };
                let first = day_seconds(first);
                let end = day_seconds(last) + SECONDS_PER_DAY - 1;
                match op {
                    CompareOp::Eq => {
                        range.lower_bound(first as f64, false);
                        range.upper_bound(end as f64, false);
                    }
                    CompareOp::Gt => range.lower_bound((end + 1) as f64, false),
                    CompareOp::Ge => range.lower_bound(first as f64, false),
                    CompareOp::Lt => range.upper_bound((first - 1) as f64, false),
                    CompareOp::Le => range.upper_bound(end as f64, false),
                    CompareOp::NotEq => range.lower_bound((end + 1) as f64, false),
                }
            }
            DateCondition::Interval {
                amount,
                unit,
                direction,
            } => {
                let now = self.reference_instant().and_utc().timestamp();
                let offset = amount.saturating_mul(unit_seconds(*unit));
                let span = offset.max(30 * SECONDS_PER_DAY);
                let target = match direction {
                    IntervalDirection::Past => now - offset,
                    IntervalDirection::Future => now + offset,
                };
                let (lower, upper) = match (op, direction) {
                    (CompareOp::Ge | CompareOp::Gt, IntervalDirection::Past) => (target, now.max(target)),
                    (CompareOp::Ge | CompareOp::Gt, IntervalDirection::Future) => (target, target + span),
                    (CompareOp::Le | CompareOp::Lt, IntervalDirection::Future) => (now.min(target), target),
                    (CompareOp::Le | CompareOp::Lt, IntervalDirection::Past) => (target - span, target),
                    (CompareOp::Eq, _) => (target, target),
                    (CompareOp::NotEq, _) => (target + SECONDS_PER_DAY, target + span),
                };
                let strict = matches!(op, CompareOp::Gt | CompareOp::Lt);
                range.lower_bound(lower as f64, strict && op == CompareOp::Gt);
                range.upper_bound(upper as f64, strict && op == CompareOp::Lt);
            }
        }
    }

    fn sample_range(
        &self,
        range: &RangeSpec,
        column: &Column,
        row: usize,
        rng: &mut dyn RngCore,
    ) -> Option<GeneratedValue> {
        let kind = column.data_kind();
        if kind.is_temporal() {
            return self.sample_temporal(range, kind, rng);
        }
        if kind.is_numeric() {
            return sample_numeric(range, column, rng);
        }
        if kind == DataKind::Text {
            let max_length = column.max_length();
            return text_in_range(range, row, max_length)
                .map(|text| GeneratedValue::Text(truncate_chars(&text, max_length)));
        }
        None
    }

    fn sample_temporal(&self, range: &RangeSpec, kind: DataKind, rng: &mut dyn RngCore) -> Option<GeneratedValue> {
        let step = if kind == DataKind::Date { SECONDS_PER_DAY } else { 1 };
        let span = 365 * SECONDS_PER_DAY;
        let now = self.reference_instant().and_utc().timestamp();

        let lower = range.lower.map(|(value, strict)| value as i64 + if strict { step } else { 0 });
        let upper = range.upper.map(|(value, strict)| value as i64 - if strict { step } else { 0 });
        let (mut low, mut high) = match (lower, upper) {
            (Some(low), Some(high)) => (low, high),
            (Some(low), None) => (low, low.max(now).max(low + span)),
            (None, Some(high)) => (high.min(now) - span, high),
            (None, None) => return None,
        };
        if kind == DataKind::Date {
            low = ceil_day(low);
            high = floor_day(high);
        }
        if low > high {
            debug!(low, high, "temporal range is empty; using the lower bound");
            high = low;
        }
        let picked = if kind == DataKind::Date {
            let days = rng.random_range(0..=(high - low) / SECONDS_PER_DAY);
            low + days * SECONDS_PER_DAY
        } else {
            rng.random_range(low..=high)
        };
        let instant = chrono::DateTime::from_timestamp(picked, 0)?.naive_utc();
        Some(if kind == DataKind::Date {
            GeneratedValue::Date(instant.date())
        } else {
            GeneratedValue::Timestamp(instant)
        })
    }
}

/// Interval collected from comparison, BETWEEN and date constraints.
///
/// Numeric columns use the value itself; temporal columns use Unix seconds.
#[derive(Debug, Default)]
struct RangeSpec {
    lower: Option<(f64, bool)>,
    upper: Option<(f64, bool)>,
    text_lower: Option<String>,
    text_upper: Option<String>,
    text_lower_strict: bool,
    text_upper_strict: bool,
}

impl RangeSpec {
    fn is_empty(&self) -> bool {
        self.lower.is_none()
            && self.upper.is_none()
            && self.text_lower.is_none()
            && self.text_upper.is_none()
    }

    fn lower_bound(&mut self, value: f64, strict: bool) {
        self.lower = match self.lower {
            Some((current, current_strict)) if current > value || (current == value && current_strict) => {
                Some((current, current_strict))
            }
            _ => Some((value, strict)),
        };
    }

    fn upper_bound(&mut self, value: f64, strict: bool) {
        self.upper = match self.upper {
            Some((current, current_strict)) if current < value || (current == value && current_strict) => {
                Some((current, current_strict))
            }
            _ => Some((value, strict)),
        };
    }

    fn push_literal(&mut self, op: CompareOp, literal: &str, kind: DataKind) {
        let axis = if kind.is_temporal() {
            parse_timestamp(literal).map(|value| value.and_utc().timestamp() as f64)
        } else if kind.is_numeric() {
            literal.trim().parse::<f64>().ok()
        } else {
            None
        };

        match axis {
            Some(value) => match op {
                CompareOp::Gt => self.lower_bound(value, true),
                CompareOp::Ge => self.lower_bound(value, false),
                CompareOp::Lt => self.upper_bound(value, true),
                CompareOp::Le => self.upper_bound(value, false),
                CompareOp::Eq | CompareOp::NotEq => {}
            },
            None if kind == DataKind::Text => match op {
                CompareOp::Gt | CompareOp::Ge => {
                    self.text_lower = Some(literal.to_string());
                    self.text_lower_strict = op == CompareOp::Gt;
                }
                CompareOp::Lt | CompareOp::Le => {
                    self.text_upper = Some(literal.to_string());
                    self.text_upper_strict = op == CompareOp::Lt;
                }
                CompareOp::Eq | CompareOp::NotEq => {}
            },
            None => debug!(literal, ?kind, "range literal does not fit the column type"),
        }
    }
}

fn sample_numeric(range: &RangeSpec, column: &Column, rng: &mut dyn RngCore) -> Option<GeneratedValue> {
    let kind = column.data_kind();
    let scale = column.column_type.scale().unwrap_or(2).max(0) as u32;
    let step = match kind {
        DataKind::Integer => 1.0,
        DataKind::Decimal => 10_f64.powi(-(scale as i32)),
        _ => 0.01,
    };

    let lower = range.lower.map(|(value, strict)| if strict { value + step } else { value });
    let upper = range.upper.map(|(value, strict)| if strict { value - step } else { value });
    let (low, mut high) = match (lower, upper) {
        (Some(low), Some(high)) => (low, high),
        (Some(low), None) => (low, low + low.abs().max(100.0)),
        (None, Some(high)) => {
            let low = high - high.abs().max(100.0);
            // Prefer positive values when the bound allows it.
            (if high > step && low < 0.0 { step.min(high) } else { low }, high)
        }
        (None, None) => return None,
    };
    if low > high {
        debug!(low, high, column = %column.name, "numeric range is empty; using the lower bound");
        high = low;
    }

    Some(match kind {
        DataKind::Integer => {
            let low = low.ceil() as i64;
            let high = (high.floor() as i64).max(low);
            GeneratedValue::Int(rng.random_range(low..=high))
        }
        DataKind::Decimal => {
            let picked = round_to_scale(rng.random_range(low..=high), scale);
            GeneratedValue::Float(picked.clamp(round_up(low, scale), high.max(round_up(low, scale))))
        }
        _ => GeneratedValue::Float(rng.random_range(low..=high)),
    })
}

fn round_up(value: f64, scale: u32) -> f64 {
    let factor = 10_f64.powi(scale as i32);
    (value * factor).ceil() / factor
}

/// Text inside the range, suffixed with the row number when the suffixed
/// form still fits both bounds and `max_length`.
fn text_in_range(range: &RangeSpec, row: usize, max_length: Option<usize>) -> Option<String> {
    let base = match (&range.text_lower, &range.text_upper) {
        (Some(lower), _) if range.text_lower_strict => format!("{lower}a"),
        (Some(lower), _) => lower.clone(),
        (None, Some(upper)) if range.text_upper_strict => {
            // A proper prefix sorts before the full string.
            let keep = upper.chars().count().saturating_sub(1);
            upper.chars().take(keep).collect()
        }
        (None, Some(upper)) => upper.clone(),
        (None, None) => return None,
    };

    let suffixed = format!("{base}_{row:03}");
    let fits_length = max_length.is_none_or(|max| suffixed.chars().count() <= max);
    let under_upper = range.text_upper.as_ref().is_none_or(|upper| {
        if range.text_upper_strict {
            suffixed.as_str() < upper.as_str()
        } else {
            suffixed.as_str() <= upper.as_str()
        }
    });
    Some(if fits_length && under_upper { suffixed } else { base })
}

/// Interpret a query literal as a value of `column`'s type.
pub fn coerce_literal(literal: &str, column: &Column) -> GeneratedValue {
    let literal = literal.trim();
    let coerced = match column.data_kind() {
        DataKind::Integer => literal
            .parse::<i64>()
            .ok()
            .or_else(|| literal.parse::<f64>().ok().map(|value| value.round() as i64))
            .map(GeneratedValue::Int),
        DataKind::Decimal => literal.parse::<f64>().ok().map(|value| {
            let scale = column.column_type.scale().unwrap_or(2).max(0) as u32;
            GeneratedValue::Float(round_to_scale(value, scale))
        }),
        DataKind::Float => literal.parse::<f64>().ok().map(GeneratedValue::Float),
        DataKind::Boolean => parse_bool(literal).map(GeneratedValue::Bool),
        DataKind::Date => parse_date(literal).map(GeneratedValue::Date),
        DataKind::Timestamp => parse_timestamp(literal).map(GeneratedValue::Timestamp),
        DataKind::Time => parse_time(literal).map(GeneratedValue::Time),
        DataKind::Uuid => Some(GeneratedValue::Uuid(literal.to_string())),
        DataKind::Json => serde_json::from_str(literal).ok().map(GeneratedValue::Json),
        DataKind::Text => None,
    };
    coerced.unwrap_or_else(|| GeneratedValue::Text(literal.to_string()))
}

fn boolean_value(value: bool, kind: DataKind) -> GeneratedValue {
    match kind {
        DataKind::Integer => GeneratedValue::Int(i64::from(value)),
        DataKind::Text => GeneratedValue::Text(if value { "true" } else { "false" }.to_string()),
        _ => GeneratedValue::Bool(value),
    }
}

fn is_excluded(value: &GeneratedValue, excluded: &[&str], kind: DataKind) -> bool {
    excluded.iter().any(|literal| {
        value.compare_literal(literal, kind) == Some(std::cmp::Ordering::Equal)
    })
}

/// Last resort when re-drawing keeps landing on an excluded literal.
fn nudge(value: GeneratedValue, row: usize) -> GeneratedValue {
    match value {
        GeneratedValue::Int(number) => GeneratedValue::Int(number + 1_000 + row as i64),
        GeneratedValue::Float(number) => GeneratedValue::Float(number + 1_000.0 + row as f64),
        GeneratedValue::Text(text) => GeneratedValue::Text(format!("{text}_{row}")),
        GeneratedValue::Date(date) => GeneratedValue::Date(date + Duration::days(1)),
        GeneratedValue::Timestamp(instant) => GeneratedValue::Timestamp(instant + Duration::seconds(1)),
        other => other,
    }
}

/// Text satisfying a LIKE pattern, made distinct per row.
///
/// `_` wildcards become random alphanumerics. A `<row:03>_<rng:03>` token is
/// placed in the trailing gap when the pattern ends with `%`, otherwise in the
/// first gap, so the required prefix/suffix/substring relation still holds.
/// The token is shortened to respect the column length, never the pattern.
pub fn like_value(
    pattern: &str,
    kind: LikeKind,
    column: &Column,
    row: usize,
    rng: &mut dyn RngCore,
) -> String {
    let segments: Vec<String> = pattern
        .split('%')
        .map(|segment| fill_wildcards(segment, rng))
        .collect();
    let core_len: usize = segments.iter().map(|segment| segment.chars().count()).sum();
    let mut token = format!("{row:03}_{:03}", rng.random_range(0..1000));

    let wants_domain = column.name.to_lowercase().contains("email")
        && matches!(kind, LikeKind::Contains | LikeKind::StartsWith)
        && !pattern.contains('@');
    let mut domain = if wants_domain { "@example.com" } else { "" };

    if segments.len() == 1 {
        return segments.concat();
    }

    let trailing = pattern.ends_with('%');
    let leading_only = !trailing && segments.len() == 2 && segments[0].is_empty();
    let separators = if trailing || leading_only { 1 } else { 2 };
    if let Some(max) = column.max_length() {
        if core_len + separators + token.chars().count() + domain.len() > max {
            domain = "";
        }
        let room = max.saturating_sub(core_len + separators);
        if room == 0 {
            token.clear();
        } else if token.chars().count() > room {
            token = token.chars().take(room).collect();
        }
        if core_len > max {
            warn!(column = %column.name, pattern, max, "LIKE pattern is longer than the column");
        }
    }

    if token.is_empty() {
        return format!("{}{domain}", segments.concat());
    }

    if trailing {
        format!("{}_{token}{domain}", segments.concat())
    } else if leading_only {
        format!("{token}_{}", segments[1])
    } else {
        let rest: String = segments[1..].concat();
        format!("{}_{token}_{rest}", segments[0])
    }
}

fn fill_wildcards(segment: &str, rng: &mut dyn RngCore) -> String {
    segment
        .chars()
        .map(|ch| {
            if ch == '_' {
                ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char
            } else {
                ch
            }
        })
        .collect()
}

fn infer_text(name: &str, row: usize, rng: &mut dyn RngCore) -> String {
    if name.contains("email") {
        let email: String = SafeEmail().fake_with_rng(rng);
        return email;
    }
    if name.contains("first_name") || name == "firstname" {
        return FirstName().fake_with_rng(rng);
    }
    if name.contains("last_name") || name == "lastname" || name == "surname" {
        return LastName().fake_with_rng(rng);
    }
    if name.contains("username") || name == "login" {
        return Username().fake_with_rng(rng);
    }
    if name.contains("company") {
        return CompanyName().fake_with_rng(rng);
    }
    if name == "name" || name.ends_with("_name") || name == "full_name" {
        return Name().fake_with_rng(rng);
    }
    if name.contains("phone") || name.contains("mobile") {
        return PhoneNumber().fake_with_rng(rng);
    }
    if name.contains("address") || name.contains("street") {
        return StreetName().fake_with_rng(rng);
    }
    if name.contains("city") {
        return CityName().fake_with_rng(rng);
    }
    if name.contains("country") {
        return CountryName().fake_with_rng(rng);
    }
    if name.contains("zip") || name.contains("postal") {
        return ZipCode().fake_with_rng(rng);
    }
    if name.contains("url") || name.contains("website") || name.contains("link") {
        let word: String = Word().fake_with_rng(rng);
        return format!("https://example.com/{word}");
    }
    if name.contains("code") || name.contains("sku") {
        let prefix: String = name.chars().filter(char::is_ascii_alphabetic).take(3).collect();
        return format!("{}-{row:04}", prefix.to_uppercase());
    }
    if name.contains("description") || name.contains("notes") || name.contains("comment") || name == "bio" {
        return Sentence(3..8).fake_with_rng(rng);
    }
    if name.contains("title") {
        return Sentence(2..4).fake_with_rng(rng);
    }
    if name == "status" || name.ends_with("_status") {
        return STATUS_VALUES.choose(rng).copied().unwrap_or("active").to_string();
    }
    let word: String = Word().fake_with_rng(rng);
    format!("{word}_{row}")
}

fn unique_text(text: &str, row: usize, name: &str) -> String {
    if name.contains("email")
        && let Some((local, domain)) = text.split_once('@')
    {
        return format!("{local}{row}@{domain}");
    }
    format!("{text}_{row}")
}

/// Character-aware truncation to an optional maximum length.
pub fn truncate_chars(text: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) if text.chars().count() > max => text.chars().take(max).collect(),
        _ => text.to_string(),
    }
}

fn integer_ceiling(column: &Column) -> i64 {
    match column.column_type.base_name().as_str() {
        "tinyint" => 127,
        "smallint" | "int2" => 32_767,
        _ => match column.column_type.precision() {
            Some(precision) if (1..18).contains(&precision) => 10_i64.pow(precision as u32) - 1,
            _ => i64::from(i32::MAX),
        },
    }
}

fn decimal_ceiling(column: &Column) -> f64 {
    match (column.column_type.precision(), column.column_type.scale()) {
        (Some(precision), Some(scale)) if precision > scale => 10_f64.powi(precision - scale) - 1.0,
        _ => f64::from(i32::MAX),
    }
}

fn unit_seconds(unit: IntervalUnit) -> i64 {
    match unit {
        IntervalUnit::Hour => 3_600,
        other => other.days() * SECONDS_PER_DAY,
    }
}

fn day_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn floor_day(seconds: i64) -> i64 {
    seconds.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

fn ceil_day(seconds: i64) -> i64 {
    let floor = floor_day(seconds);
    if floor == seconds { floor } else { floor + SECONDS_PER_DAY }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sqlseed_core::ColumnType;
    use sqlseed_query::ColumnRef;

    use super::*;

    fn column(name: &str, data_type: &str, max: Option<i32>) -> Column {
        Column {
            ordinal_position: 1,
            name: name.to_string(),
            column_type: ColumnType {
                data_type: data_type.to_string(),
                character_max_length: max,
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

    #[test]
    fn like_token_lands_in_the_right_gap() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let text = column("label", "varchar(64)", None);

        let contains = like_value("%test%", LikeKind::Contains, &text, 3, &mut rng);
        assert!(contains.starts_with("test_003_"), "{contains}");

        let ends = like_value("%.com", LikeKind::EndsWith, &text, 4, &mut rng);
        assert!(ends.starts_with("004_") && ends.ends_with("_.com"), "{ends}");

        let middle = like_value("ab%yz", LikeKind::Exact, &text, 5, &mut rng);
        assert!(middle.starts_with("ab_005_") && middle.ends_with("_yz"), "{middle}");

        let exact = like_value("a_c", LikeKind::Exact, &text, 6, &mut rng);
        assert_eq!(exact.len(), 3);
        assert!(exact.starts_with('a') && exact.ends_with('c'));
    }

    #[test]
    fn like_token_shrinks_to_fit_max_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let short = column("code", "varchar(8)", None);
        let value = like_value("abc%", LikeKind::StartsWith, &short, 12, &mut rng);
        assert_eq!(value.chars().count(), 8);
        assert!(value.starts_with("abc_012"));
    }

    #[test]
    fn email_like_values_get_a_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let email = column("email", "varchar(255)", None);
        let value = like_value("%test%", LikeKind::Contains, &email, 1, &mut rng);
        assert!(value.contains("test") && value.ends_with("@example.com"), "{value}");
    }

    #[test]
    fn coerce_literal_follows_column_kind() {
        assert_eq!(coerce_literal("42", &column("qty", "int", None)), GeneratedValue::Int(42));
        assert_eq!(
            coerce_literal("TRUE", &column("is_active", "boolean", None)),
            GeneratedValue::Bool(true)
        );
        assert_eq!(
            coerce_literal("2024-02-29", &column("born_on", "date", None)),
            GeneratedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"))
        );
        assert_eq!(
            coerce_literal("x", &column("qty", "int", None)),
            GeneratedValue::Text("x".to_string())
        );
    }

    #[test]
    fn boolean_keyword_on_integer_flag_becomes_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let is_active = column("is_active", "int", None);
        let table = Table {
            name: "roles".to_string(),
            columns: vec![is_active.clone()],
            constraints: Vec::new(),
            comment: None,
        };
        let bound = BoundConstraint {
            constraint: Constraint::Join {
                condition: JoinCondition::Filter {
                    target: ColumnRef::new("r", "is_active"),
                    op: CompareOp::Eq,
                    value: "TRUE".to_string(),
                },
                source: "r.is_active = TRUE".to_string(),
            },
            table: "roles".to_string(),
            column: Some("is_active".to_string()),
            peer: None,
        };

        let synth = ValueSynthesizer::new(NaiveDate::from_ymd_opt(2025, 6, 15).expect("date"));
        let value = synth.synthesize(&table, &is_active, 1, &[&bound], &mut rng);
        assert_eq!(value, GeneratedValue::Int(1));
    }

    #[test]
    fn text_between_gives_each_row_its_own_value() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let code = column("code", "varchar(16)", None);
        let table = Table {
            name: "vouchers".to_string(),
            columns: vec![code.clone()],
            constraints: Vec::new(),
            comment: None,
        };
        let bound = BoundConstraint {
            constraint: Constraint::Between {
                target: ColumnRef::new("v", "code"),
                min: "a".to_string(),
                max: "z".to_string(),
                data_kind: BetweenKind::String,
                source: "v.code BETWEEN 'a' AND 'z'".to_string(),
            },
            table: "vouchers".to_string(),
            column: Some("code".to_string()),
            peer: None,
        };
        let synth = ValueSynthesizer::new(NaiveDate::from_ymd_opt(2025, 6, 15).expect("date"));

        let values: Vec<String> = (1..=5)
            .map(|row| synth.synthesize(&table, &code, row, &[&bound], &mut rng).to_string())
            .collect();
        assert_eq!(values[0], "a_001");
        let unique: std::collections::HashSet<&String> = values.iter().collect();
        assert_eq!(unique.len(), 5);
        assert!(values.iter().all(|value| value.as_str() >= "a" && value.as_str() <= "z"));
    }

    #[test]
    fn text_range_drops_the_suffix_when_it_would_not_fit() {
        let range = RangeSpec {
            text_lower: Some("abc".to_string()),
            text_upper: Some("abc_".to_string()),
            ..RangeSpec::default()
        };
        assert_eq!(text_in_range(&range, 7, None).as_deref(), Some("abc"));

        let open = RangeSpec {
            text_lower: Some("abc".to_string()),
            ..RangeSpec::default()
        };
        assert_eq!(text_in_range(&open, 7, Some(4)).as_deref(), Some("abc"));
        assert_eq!(text_in_range(&open, 7, Some(8)).as_deref(), Some("abc_007"));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("ñandú", Some(3)), "ñan");
        assert_eq!(truncate_chars("abc", None), "abc");
    }
}
