//! Tolerant constraint extraction from raw SQL text.
//!
//! No grammar is involved: the WHERE clause is isolated with a quote- and
//! parenthesis-aware scan, then independent regex passes mine one family of
//! predicates each. Every family runs an `alias.column` pattern first and a
//! bare-column pattern second; bare matches on a column already captured
//! with an alias are skipped. Patterns run over a literal-masked copy of the
//! text so operators inside string literals never match.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::{
    AliasMap, BetweenKind, ColumnRef, CompareOp, Constraint, ConstraintSet, DateCondition,
    InList, IntervalDirection, IntervalUnit, JoinCondition, LikeKind, looks_numeric,
};
use crate::tables::alias_map;
use crate::text::{
    ON_TERMINATORS, WHERE_TERMINATORS, find_top_level, mask_literals, matching_paren,
    normalize_sql, region_end, split_top_level, unquote,
};

/// Words that are never columns nor compared literals.
const RESERVED: &[&str] = &[
    "AND", "OR", "NOT", "IN", "EXISTS", "BETWEEN", "LIKE", "ILIKE", "IS", "NULL", "NOW",
    "TRUE", "FALSE", "SYSDATE", "SYSTIMESTAMP", "CURDATE", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "LOCALTIMESTAMP", "GETDATE", "INTERVAL", "DATE", "TIMESTAMP", "DAY",
    "WEEK", "MONTH", "YEAR", "HOUR", "SELECT", "FROM", "WHERE", "CASE", "WHEN", "THEN", "ELSE",
    "END", "ON", "AS", "ANY", "ALL", "SOME", "DISTINCT", "HAVING",
];

const OP: &str = r"(?P<op>>=|<=|<>|!=|=|>|<)";
const ALIASED_COL: &str = r"\b(?P<alias>[A-Za-z_]\w*)\.(?P<col>[A-Za-z_]\w*)";
const BARE_COL: &str = r"(?:^|[^\w.])(?P<col>[A-Za-z_]\w*)";
const INNER_BARE_COL: &str = r"(?P<col>[A-Za-z_]\w*)";
const LITERAL: &str = r"(?:(?:DATE|TIMESTAMP)\s+)?'[^']*'|-?\d+(?:\.\d+)?";
const NOW_ANCHOR: &str = r"(?:NOW\s*\(\s*\)|CURDATE\s*\(\s*\)|GETDATE\s*\(\s*\)|CURRENT_DATE|CURRENT_TIMESTAMP|LOCALTIMESTAMP|SYSDATE|SYSTIMESTAMP)";
const UNIT: &str = r"(?P<unit>HOUR|DAY|WEEK|MONTH|YEAR)S?";

/// A predicate family compiled twice: with an alias and with a bare column.
struct Family {
    aliased: Regex,
    bare: Regex,
}

impl Family {
    /// `{COL}` opens a predicate; `{ICOL}` sits inside a function call.
    fn new(template: &str) -> Self {
        let aliased = template
            .replace("{COL}", ALIASED_COL)
            .replace("{ICOL}", ALIASED_COL);
        let bare = template
            .replace("{COL}", BARE_COL)
            .replace("{ICOL}", INNER_BARE_COL);
        Self {
            aliased: compile(&aliased),
            bare: compile(&bare),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("valid extraction regex")
}

static WHERE_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"{{COL}}\s*{OP}\s*(?P<value>TO_(?:DATE|TIMESTAMP)\s*\(\s*'[^']*'[^)]*\)|{LITERAL}|[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?(?:\s*\()?)"
    ))
});

static LIKE_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(r"{COL}\s*\)?\s+(?P<not>NOT\s+)?I?LIKE\s+(?P<value>'[^']*')")
});

static BETWEEN_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"{{COL}}\s+(?P<not>NOT\s+)?BETWEEN\s+(?P<min>{LITERAL})\s+AND\s+(?P<max>{LITERAL})"
    ))
});

static IN_FAMILY: Lazy<Family> =
    Lazy::new(|| Family::new(r"{COL}\s+(?P<not>NOT\s+)?IN\s*\("));

static NULL_FAMILY: Lazy<Family> =
    Lazy::new(|| Family::new(r"{COL}\s+IS\s+(?P<not>NOT\s+)?NULL\b"));

static BOOLEAN_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(r"{COL}\s*(?:(?P<op>=|!=|<>)\s*|IS\s+(?P<isnot>NOT\s+)?)(?P<lit>TRUE|FALSE)\b")
});

static YEAR_FN_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"\bYEAR\s*\(\s*{{ICOL}}\s*\)\s*{OP}\s*(?P<year>'[^']*'|\d{{4}})"
    ))
});

static EXTRACT_YEAR_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"\bEXTRACT\s*\(\s*YEAR\s+FROM\s+{{ICOL}}\s*\)\s*{OP}\s*(?P<year>'[^']*'|\d{{4}})"
    ))
});

static NOW_OFFSET_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"{{COL}}\s*{OP}\s*{NOW_ANCHOR}(?:\s*(?P<sign>[+-])\s*(?:INTERVAL\s*(?P<amount>'[^']*'|\d+)(?:\s*{UNIT})?|(?P<days>\d+)\b))?"
    ))
});

static DATE_FN_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"{{COL}}\s*{OP}\s*DATE_(?P<fn>SUB|ADD)\s*\(\s*{NOW_ANCHOR}\s*,\s*INTERVAL\s*(?P<amount>'[^']*'|\d+)(?:\s*{UNIT})?\s*\)"
    ))
});

static ADD_MONTHS_FAMILY: Lazy<Family> = Lazy::new(|| {
    Family::new(&format!(
        r"{{COL}}\s*{OP}\s*ADD_MONTHS\s*\(\s*{NOW_ANCHOR}\s*,\s*(?P<amount>-?\d+)\s*\)"
    ))
});

static NOT_EXISTS_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\bNOT\s+EXISTS\s*\("));

static EXISTS_RE: Lazy<Regex> = Lazy::new(|| compile(r"\bEXISTS\s*\("));

static SUBQUERY_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\bFROM\s+(?P<table>[A-Za-z_][\w$#]*(?:\.[A-Za-z_][\w$#]*)?)"));

static JOIN_HEAD_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"\bJOIN\s+(?P<table>[A-Za-z_][\w$#]*(?:\.[A-Za-z_][\w$#]*)?)(?:\s+(?:AS\s+)?(?P<alias>[A-Za-z_]\w*))?\s+ON\b")
});

static EQUI_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?P<la>[A-Za-z_]\w*)\.(?P<lc>[A-Za-z_]\w*)\s*=\s*(?P<ra>[A-Za-z_]\w*)\.(?P<rc>[A-Za-z_]\w*)$")
});

static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?P<alias>[A-Za-z_]\w*)\.(?P<col>[A-Za-z_]\w*)\s*{OP}\s*(?P<value>.+)$"
    ))
});

const NOT_EXISTS_PLACEHOLDER: &str = "__NOT_EXISTS_";

/// Extract every recognizable predicate from `sql`. Never fails; anything
/// that does not match a known shape is skipped.
pub fn extract(sql: &str) -> ConstraintSet {
    let normalized = normalize_sql(sql);
    let fingerprint = hex::encode(Sha256::digest(normalized.as_bytes()));
    let aliases = alias_map(&normalized);

    let (text, negated) = mask_not_exists(&normalized);
    let mut sink = Sink::default();

    let where_clause = isolate_where(&text);
    if let Some(clause) = where_clause {
        let scan = Scan::new(clause);
        extract_where(&scan, &aliases, &mut sink);
        extract_like(&scan, &mut sink);
        extract_between(&scan, &mut sink);
        extract_in(&scan, &mut sink);
        extract_null(&scan, &mut sink);
        extract_exists(&scan, &negated, &mut sink);
        extract_dates(&scan, &mut sink);
        extract_booleans(&scan, &mut sink);
    }
    extract_joins(&Scan::new(&text), &mut sink);

    let set = ConstraintSet {
        constraints: sink.constraints,
        aliases,
        where_clause: where_clause.map(str::to_string),
        fingerprint,
    };
    debug!(
        constraints = set.len(),
        tables = set.aliases.tables().len(),
        fingerprint = %set.fingerprint,
        "constraints extracted"
    );
    set
}

/// Top-level WHERE clause text, up to the next top-level clause keyword.
pub fn isolate_where(text: &str) -> Option<&str> {
    let (_, start) = find_top_level(text, 0, &["WHERE"])?;
    let end = region_end(text, start, WHERE_TERMINATORS);
    let clause = text[start..end].trim();
    (!clause.is_empty()).then_some(clause)
}

/// Replace every `NOT EXISTS (...)` with a placeholder so its predicates are
/// not mined as positive constraints. Returns the rewritten text and the
/// masked subqueries in order.
fn mask_not_exists(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut subqueries = Vec::new();
    let mut rest = text;

    loop {
        let masked = mask_literals(rest);
        let Some(found) = NOT_EXISTS_RE.find(&masked) else {
            break;
        };
        let open = found.end() - 1;
        let Some(close) = matching_paren(&masked, open) else {
            break;
        };
        out.push_str(&rest[..found.start()]);
        out.push_str(&format!("{NOT_EXISTS_PLACEHOLDER}{}__", subqueries.len()));
        subqueries.push(rest[open + 1..close].trim().to_string());
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    (out, subqueries)
}

/// Original text alongside its literal-masked twin.
struct Scan<'a> {
    text: &'a str,
    masked: String,
}

impl<'a> Scan<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            masked: mask_literals(text),
        }
    }

    /// Run a family and hand each match to `f`, aliased matches first.
    fn each(&self, family: &Family, mut f: impl FnMut(&Captures<'_>, ColumnRef)) {
        let mut aliased_columns = BTreeSet::new();
        for caps in family.aliased.captures_iter(&self.masked) {
            let (Some(alias), Some(col)) = (caps.name("alias"), caps.name("col")) else {
                continue;
            };
            if is_reserved(alias.as_str()) || is_reserved(col.as_str()) {
                continue;
            }
            aliased_columns.insert(col.as_str().to_lowercase());
            f(&caps, ColumnRef::new(alias.as_str(), col.as_str()));
        }
        for caps in family.bare.captures_iter(&self.masked) {
            let Some(col) = caps.name("col") else {
                continue;
            };
            if is_reserved(col.as_str())
                || col.as_str().starts_with(NOT_EXISTS_PLACEHOLDER)
                || aliased_columns.contains(&col.as_str().to_lowercase())
            {
                continue;
            }
            f(&caps, ColumnRef::new("", col.as_str()));
        }
    }

    /// Original text of a named group.
    fn group(&self, caps: &Captures<'_>, name: &str) -> Option<&'a str> {
        caps.name(name).map(|m| &self.text[m.start()..m.end()])
    }

    /// Original text of the whole match, trimmed of the bare-column prefix.
    fn source(&self, caps: &Captures<'_>) -> String {
        let whole = caps.get(0).map(|m| &self.text[m.start()..m.end()]).unwrap_or_default();
        whole
            .trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
            .trim()
            .to_string()
    }
}

#[derive(Default)]
struct Sink {
    constraints: Vec<Constraint>,
}

impl Sink {
    fn push(&mut self, constraint: Constraint) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(word))
}

fn extract_where(scan: &Scan<'_>, aliases: &AliasMap, sink: &mut Sink) {
    scan.each(&WHERE_FAMILY, |caps, target| {
        let Some(op) = caps.name("op").and_then(|m| CompareOp::parse(m.as_str())) else {
            return;
        };
        let Some(raw) = scan.group(caps, "value") else {
            return;
        };
        let source = scan.source(caps);

        match classify_value(raw) {
            ValueShape::Literal(value) => sink.push(Constraint::Where {
                target,
                op,
                value,
                source,
            }),
            ValueShape::Column(alias, column) if op == CompareOp::Eq && target.has_alias() => {
                let right_table = aliases.table_for(&alias).map(str::to_string);
                sink.push(Constraint::Join {
                    condition: JoinCondition::Equi {
                        left: target,
                        right: ColumnRef::new(alias, column),
                        right_table,
                    },
                    source,
                });
            }
            _ => {}
        }
    });
}

enum ValueShape {
    Literal(String),
    Column(String, String),
    Other,
}

fn classify_value(raw: &str) -> ValueShape {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();

    if upper.starts_with("TO_DATE") || upper.starts_with("TO_TIMESTAMP") {
        let Some(open) = trimmed.find('\'') else {
            return ValueShape::Other;
        };
        let rest = &trimmed[open + 1..];
        return match rest.find('\'') {
            Some(close) => ValueShape::Literal(rest[..close].to_string()),
            None => ValueShape::Other,
        };
    }
    if let Some(open) = trimmed.find('\'') {
        // Plain, DATE '...' or TIMESTAMP '...' literal.
        return ValueShape::Literal(unquote(&trimmed[open..]));
    }
    if looks_numeric(trimmed) {
        return ValueShape::Literal(trimmed.to_string());
    }
    if trimmed.ends_with('(') || is_reserved(trimmed) {
        return ValueShape::Other;
    }
    match trimmed.split_once('.') {
        Some((alias, column)) if !is_reserved(alias) && !is_reserved(column) => {
            ValueShape::Column(alias.to_string(), column.to_string())
        }
        _ => ValueShape::Other,
    }
}

fn extract_like(scan: &Scan<'_>, sink: &mut Sink) {
    scan.each(&LIKE_FAMILY, |caps, target| {
        if caps.name("not").is_some() {
            return;
        }
        let Some(raw) = scan.group(caps, "value") else {
            return;
        };
        let pattern = unquote(raw);
        let required_substring: String =
            pattern.chars().filter(|c| *c != '%' && *c != '_').collect();
        sink.push(Constraint::Like {
            target,
            kind: LikeKind::classify(&pattern),
            required_substring,
            pattern,
            source: scan.source(caps),
        });
    });
}

fn extract_between(scan: &Scan<'_>, sink: &mut Sink) {
    scan.each(&BETWEEN_FAMILY, |caps, target| {
        if caps.name("not").is_some() {
            return;
        }
        let (Some(min), Some(max)) = (scan.group(caps, "min"), scan.group(caps, "max")) else {
            return;
        };
        let min = literal_value(min);
        let max = literal_value(max);
        sink.push(Constraint::Between {
            target,
            data_kind: BetweenKind::infer(&min, &max),
            min,
            max,
            source: scan.source(caps),
        });
    });
}

fn literal_value(raw: &str) -> String {
    match raw.find('\'') {
        Some(open) => unquote(&raw[open..]),
        None => raw.trim().to_string(),
    }
}

fn extract_in(scan: &Scan<'_>, sink: &mut Sink) {
    scan.each(&IN_FAMILY, |caps, target| {
        let Some(whole) = caps.get(0) else {
            return;
        };
        let open = whole.end() - 1;
        let Some(close) = matching_paren(&scan.masked, open) else {
            return;
        };
        let body = scan.text[open + 1..close].trim();
        let upper = body.to_ascii_uppercase();

        let list = if upper.starts_with("SELECT") || upper.starts_with("WITH") {
            InList::Subquery {
                subquery: body.to_string(),
            }
        } else {
            let items = split_top_level(body, ",");
            if items.is_empty() {
                return;
            }
            if items.iter().all(|item| looks_numeric(item)) {
                InList::NumericList {
                    values: items.iter().map(|item| item.to_string()).collect(),
                }
            } else {
                InList::StringList {
                    values: items.iter().map(|item| unquote(item)).collect(),
                }
            }
        };

        let start = scan.source(caps);
        sink.push(Constraint::In {
            target,
            list,
            negated: caps.name("not").is_some(),
            source: format!("{}{})", start, body),
        });
    });
}

fn extract_null(scan: &Scan<'_>, sink: &mut Sink) {
    scan.each(&NULL_FAMILY, |caps, target| {
        sink.push(Constraint::Null {
            target,
            is_null: caps.name("not").is_none(),
            source: scan.source(caps),
        });
    });
}

fn extract_exists(scan: &Scan<'_>, negated: &[String], sink: &mut Sink) {
    for found in EXISTS_RE.find_iter(&scan.masked) {
        let open = found.end() - 1;
        let Some(close) = matching_paren(&scan.masked, open) else {
            continue;
        };
        let subquery = scan.text[open + 1..close].trim().to_string();
        sink.push(Constraint::Exists {
            is_exists: true,
            table: subquery_table(&subquery),
            source: scan.text[found.start()..=close].to_string(),
            subquery,
        });
    }

    for (index, subquery) in negated.iter().enumerate() {
        let placeholder = format!("{NOT_EXISTS_PLACEHOLDER}{index}__");
        if !scan.text.contains(&placeholder) {
            continue;
        }
        sink.push(Constraint::Exists {
            is_exists: false,
            table: subquery_table(subquery),
            source: format!("NOT EXISTS ({subquery})"),
            subquery: subquery.clone(),
        });
    }
}

fn subquery_table(subquery: &str) -> Option<String> {
    SUBQUERY_TABLE_RE
        .captures(subquery)
        .and_then(|caps| caps.name("table"))
        .map(|m| sqlseed_core::unqualified(m.as_str()).to_string())
}

fn extract_dates(scan: &Scan<'_>, sink: &mut Sink) {
    for family in [&*YEAR_FN_FAMILY, &*EXTRACT_YEAR_FAMILY] {
        scan.each(family, |caps, target| {
            let Some(op) = caps.name("op").and_then(|m| CompareOp::parse(m.as_str())) else {
                return;
            };
            let Some(year) = scan
                .group(caps, "year")
                .and_then(|raw| unquote(raw).parse::<i32>().ok())
            else {
                return;
            };
            sink.push(Constraint::Date {
                target,
                condition: DateCondition::YearEquals { year },
                op,
                source: scan.source(caps),
            });
        });
    }

    scan.each(&NOW_OFFSET_FAMILY, |caps, target| {
        let Some(op) = caps.name("op").and_then(|m| CompareOp::parse(m.as_str())) else {
            return;
        };
        let direction = match caps.name("sign").map(|m| m.as_str()) {
            Some("+") => IntervalDirection::Future,
            _ => IntervalDirection::Past,
        };
        let (amount, unit) = if let Some(days) = scan.group(caps, "days") {
            (days.parse::<i64>().unwrap_or(0), IntervalUnit::Day)
        } else {
            match scan.group(caps, "amount") {
                Some(raw) => {
                    let Some(parsed) = interval_amount(raw, caps) else {
                        return;
                    };
                    parsed
                }
                None => (0, IntervalUnit::Day),
            }
        };
        sink.push(Constraint::Date {
            target,
            condition: DateCondition::Interval {
                amount,
                unit,
                direction,
            },
            op,
            source: scan.source(caps),
        });
    });

    scan.each(&DATE_FN_FAMILY, |caps, target| {
        let Some(op) = caps.name("op").and_then(|m| CompareOp::parse(m.as_str())) else {
            return;
        };
        let Some((amount, unit)) = scan
            .group(caps, "amount")
            .and_then(|raw| interval_amount(raw, caps))
        else {
            return;
        };
        let direction = match caps.name("fn").map(|m| m.as_str().to_ascii_uppercase()) {
            Some(name) if name == "ADD" => IntervalDirection::Future,
            _ => IntervalDirection::Past,
        };
        sink.push(Constraint::Date {
            target,
            condition: DateCondition::Interval {
                amount,
                unit,
                direction,
            },
            op,
            source: scan.source(caps),
        });
    });

    scan.each(&ADD_MONTHS_FAMILY, |caps, target| {
        let Some(op) = caps.name("op").and_then(|m| CompareOp::parse(m.as_str())) else {
            return;
        };
        let Some(months) = scan
            .group(caps, "amount")
            .and_then(|raw| raw.parse::<i64>().ok())
        else {
            return;
        };
        let direction = if months < 0 {
            IntervalDirection::Past
        } else {
            IntervalDirection::Future
        };
        sink.push(Constraint::Date {
            target,
            condition: DateCondition::Interval {
                amount: months.abs(),
                unit: IntervalUnit::Month,
                direction,
            },
            op,
            source: scan.source(caps),
        });
    });
}

/// Amount and unit of an INTERVAL, accepting both `INTERVAL 7 DAY` and
/// `INTERVAL '7 days'`.
fn interval_amount(raw: &str, caps: &Captures<'_>) -> Option<(i64, IntervalUnit)> {
    let unquoted = unquote(raw);
    let mut tokens = unquoted.split_whitespace();
    let amount = tokens.next()?.parse::<i64>().ok()?;
    let unit = tokens
        .next()
        .and_then(IntervalUnit::parse)
        .or_else(|| caps.name("unit").and_then(|m| IntervalUnit::parse(m.as_str())))
        .unwrap_or(IntervalUnit::Day);
    Some((amount, unit))
}

fn extract_booleans(scan: &Scan<'_>, sink: &mut Sink) {
    scan.each(&BOOLEAN_FAMILY, |caps, target| {
        let Some(literal) = caps.name("lit").map(|m| m.as_str().to_ascii_uppercase()) else {
            return;
        };
        let negated = caps.name("isnot").is_some()
            || matches!(caps.name("op").map(|m| m.as_str()), Some("!=") | Some("<>"));
        let value = (literal == "TRUE") != negated;
        sink.push(Constraint::Boolean {
            target,
            literal,
            value,
            source: scan.source(caps),
        });
    });
}

/// JOIN ... ON clauses: column equalities become equi joins, comparisons
/// against literals become join filters.
fn extract_joins(scan: &Scan<'_>, sink: &mut Sink) {
    for caps in JOIN_HEAD_RE.captures_iter(&scan.masked) {
        let (Some(table), Some(whole)) = (caps.name("table"), caps.get(0)) else {
            continue;
        };
        let table = sqlseed_core::unqualified(table.as_str()).to_string();
        let joined = caps
            .name("alias")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| table.clone());

        let start = whole.end();
        let end = region_end(&scan.masked, start, ON_TERMINATORS);
        let on_text = &scan.text[start..end];

        for part in split_top_level(on_text, "AND") {
            let part = strip_parens(part);
            if let Some(equi) = EQUI_RE.captures(part) {
                let (Some(la), Some(lc), Some(ra), Some(rc)) = (
                    equi.name("la"),
                    equi.name("lc"),
                    equi.name("ra"),
                    equi.name("rc"),
                ) else {
                    continue;
                };
                let mut left = ColumnRef::new(la.as_str(), lc.as_str());
                let mut right = ColumnRef::new(ra.as_str(), rc.as_str());
                if left.alias.eq_ignore_ascii_case(&joined)
                    && !right.alias.eq_ignore_ascii_case(&joined)
                {
                    std::mem::swap(&mut left, &mut right);
                }
                let right_table = right
                    .alias
                    .eq_ignore_ascii_case(&joined)
                    .then(|| table.clone());
                sink.push(Constraint::Join {
                    condition: JoinCondition::Equi {
                        left,
                        right,
                        right_table,
                    },
                    source: part.to_string(),
                });
                continue;
            }

            let Some(filter) = FILTER_RE.captures(part) else {
                continue;
            };
            let (Some(alias), Some(col), Some(op), Some(value)) = (
                filter.name("alias"),
                filter.name("col"),
                filter.name("op").and_then(|m| CompareOp::parse(m.as_str())),
                filter.name("value"),
            ) else {
                continue;
            };
            let value = match classify_value(value.as_str()) {
                ValueShape::Literal(value) => value,
                ValueShape::Other
                    if matches!(
                        value.as_str().trim().to_ascii_uppercase().as_str(),
                        "TRUE" | "FALSE"
                    ) =>
                {
                    value.as_str().trim().to_ascii_uppercase()
                }
                _ => continue,
            };
            sink.push(Constraint::Join {
                condition: JoinCondition::Filter {
                    target: ColumnRef::new(alias.as_str(), col.as_str()),
                    op,
                    value,
                },
                source: part.to_string(),
            });
        }
    }
}

fn strip_parens(mut part: &str) -> &str {
    loop {
        let trimmed = part.trim();
        if trimmed.starts_with('(')
            && matching_paren(trimmed, 0) == Some(trimmed.len() - 1)
        {
            part = &trimmed[1..trimmed.len() - 1];
        } else {
            return trimmed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_is_isolated_before_order_by() {
        let text = "SELECT * FROM t WHERE t.a = 1 AND t.b IN (SELECT x FROM y ORDER BY x) ORDER BY t.a";
        assert_eq!(
            isolate_where(text),
            Some("t.a = 1 AND t.b IN (SELECT x FROM y ORDER BY x)")
        );
    }

    #[test]
    fn not_exists_subqueries_are_masked() {
        let (text, negated) = mask_not_exists(
            "SELECT * FROM u WHERE NOT EXISTS (SELECT 1 FROM o WHERE o.total > 5) AND u.a = 1",
        );
        assert_eq!(negated, vec!["SELECT 1 FROM o WHERE o.total > 5".to_string()]);
        assert!(text.contains("__NOT_EXISTS_0__ AND u.a = 1"));
        assert!(!text.contains("o.total"));
    }

    #[test]
    fn operators_inside_literals_are_ignored() {
        let set = extract("SELECT * FROM t WHERE t.note = 'a.b = 3' AND t.code LIKE '%x.y > 2%'");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn value_shapes() {
        assert!(matches!(classify_value("'it''s'"), ValueShape::Literal(v) if v == "it's"));
        assert!(matches!(classify_value("DATE '2024-01-01'"), ValueShape::Literal(v) if v == "2024-01-01"));
        assert!(matches!(
            classify_value("TO_DATE('2024-02-03', 'YYYY-MM-DD')"),
            ValueShape::Literal(v) if v == "2024-02-03"
        ));
        assert!(matches!(classify_value("-4.5"), ValueShape::Literal(v) if v == "-4.5"));
        assert!(matches!(classify_value("r.id"), ValueShape::Column(a, c) if a == "r" && c == "id"));
        assert!(matches!(classify_value("NOW("), ValueShape::Other));
        assert!(matches!(classify_value("SYSDATE"), ValueShape::Other));
    }
}
