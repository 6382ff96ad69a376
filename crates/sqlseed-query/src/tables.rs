//! FROM / JOIN table-reference scanning.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlseed_core::unqualified;

use crate::model::AliasMap;
use crate::text::{mask_literals, matching_paren};

static SOURCE_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(FROM|JOIN)\b").expect("valid FROM/JOIN regex"));

static CTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^WITH\s+(?:RECURSIVE\s+)?|,\s*)([A-Za-z_]\w*)\s*(?:\([^)]*\)\s*)?AS\s*\(")
        .expect("valid CTE regex")
});

/// Words that end a table reference instead of naming an alias.
const STOP_WORDS: &[&str] = &[
    "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "NATURAL", "ON",
    "USING", "GROUP", "ORDER", "HAVING", "LIMIT", "UNION", "EXCEPT", "INTERSECT", "MINUS",
    "SET", "START", "CONNECT", "FETCH", "OFFSET", "WINDOW", "FOR", "STRAIGHT_JOIN",
    "PARTITION", "TABLESAMPLE", "SELECT", "LATERAL", "VALUES", "WITH", "AND", "OR",
];

/// Functions whose arguments use `FROM` without naming a table.
const FROM_FUNCTIONS: &[&str] = &["EXTRACT", "TRIM", "SUBSTRING", "SUBSTR", "OVERLAY", "POSITION"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Table name without schema qualifier or quotes.
    pub name: String,
    pub alias: Option<String>,
}

/// All table references named in FROM and JOIN clauses, including those in
/// subqueries, in order of appearance. CTE names and `DUAL` are skipped.
pub fn scan_table_refs(sql: &str) -> Vec<TableRef> {
    let masked = mask_literals(sql);
    let ctes = cte_names(&masked);
    let mut refs = Vec::new();

    for found in SOURCE_KEYWORD_RE.find_iter(&masked) {
        let is_from = found.as_str().eq_ignore_ascii_case("from");
        if is_from && inside_from_function(&masked, found.start()) {
            continue;
        }
        parse_reference_list(&masked, found.end(), is_from, &mut refs);
    }

    refs.retain(|table_ref| {
        !ctes.contains(&table_ref.name.to_lowercase())
            && !table_ref.name.eq_ignore_ascii_case("dual")
    });
    refs
}

/// Alias map built from every table reference in the query.
pub fn alias_map(sql: &str) -> AliasMap {
    let mut map = AliasMap::default();
    for table_ref in scan_table_refs(sql) {
        map.insert(&table_ref.name, table_ref.alias.as_deref());
    }
    map
}

fn cte_names(masked: &str) -> BTreeSet<String> {
    if !masked.trim_start().to_ascii_uppercase().starts_with("WITH") {
        return BTreeSet::new();
    }
    CTE_RE
        .captures_iter(masked.trim_start())
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn inside_from_function(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0_i32;
    let mut idx = pos;
    while idx > 0 {
        idx -= 1;
        match bytes[idx] {
            b')' => depth += 1,
            b'(' => {
                if depth == 0 {
                    let name = text[..idx].trim_end();
                    let start = name
                        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .map(|i| i + 1)
                        .unwrap_or(0);
                    let function = &name[start..];
                    return FROM_FUNCTIONS
                        .iter()
                        .any(|candidate| candidate.eq_ignore_ascii_case(function));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    false
}

fn parse_reference_list(text: &str, mut idx: usize, is_from: bool, refs: &mut Vec<TableRef>) {
    let bytes = text.as_bytes();
    loop {
        idx = skip_ws(bytes, idx);
        if idx >= bytes.len() {
            return;
        }

        if bytes[idx] == b'(' {
            // Derived table; its own FROM is picked up by the outer scan.
            let Some(close) = matching_paren(text, idx) else {
                return;
            };
            idx = close + 1;
            let (_, next) = read_alias(text, idx);
            idx = next;
        } else {
            let (token, next) = read_word(text, idx, true);
            if token.is_empty() || is_stop_word(token) {
                return;
            }
            idx = next;
            if bytes.get(skip_ws(bytes, idx)) == Some(&b'(') {
                // Table-valued function call.
                return;
            }
            let (alias, next) = read_alias(text, idx);
            idx = next;
            refs.push(TableRef {
                name: unqualified(token).to_string(),
                alias: alias.map(str::to_string),
            });
        }

        idx = skip_ws(bytes, idx);
        if is_from && bytes.get(idx) == Some(&b',') {
            idx += 1;
            continue;
        }
        return;
    }
}

fn read_alias(text: &str, idx: usize) -> (Option<&str>, usize) {
    let bytes = text.as_bytes();
    let start = skip_ws(bytes, idx);
    let (word, next) = read_word(text, start, false);
    if word.eq_ignore_ascii_case("as") {
        let start = skip_ws(bytes, next);
        let (alias, next) = read_word(text, start, false);
        if alias.is_empty() {
            return (None, idx);
        }
        return (Some(alias), next);
    }
    if word.is_empty() || is_stop_word(word) {
        return (None, idx);
    }
    (Some(word), next)
}

fn read_word(text: &str, start: usize, qualified: bool) -> (&str, usize) {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let byte = bytes[end];
        let allowed = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'$' | b'#')
            || (qualified && byte == b'.');
        if !allowed {
            break;
        }
        end += 1;
    }
    (&text[start..end], end)
}

fn skip_ws(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS
        .iter()
        .any(|stop| stop.eq_ignore_ascii_case(word))
}
