//! Alias → table resolution.
//!
//! The explicit alias map from FROM/JOIN wins. When an alias was never
//! declared (or points outside the candidate tables) naming heuristics pick
//! the first candidate that looks like it, in candidate order.

use crate::model::AliasMap;

/// Resolve `alias` against `candidates`, returning the candidate's spelling.
pub fn resolve_alias<'a>(alias: &str, aliases: &AliasMap, candidates: &'a [String]) -> Option<&'a str> {
    if alias.is_empty() {
        return None;
    }

    if let Some(table) = aliases.table_for(alias) {
        if let Some(found) = candidates
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(table))
        {
            return Some(found.as_str());
        }
    }

    candidates
        .iter()
        .find(|candidate| alias_matches(alias, candidate))
        .map(String::as_str)
}

/// Naming heuristics: exact name, short prefix, acronym of `_` words, then
/// singular/plural or substring match.
pub fn alias_matches(alias: &str, table: &str) -> bool {
    let alias = alias.to_lowercase();
    let table = table.to_lowercase();

    if alias == table {
        return true;
    }
    if alias.len() <= 3 && table.starts_with(&alias) {
        return true;
    }
    if table.contains('_') && acronym(&table) == alias {
        return true;
    }
    if singular(&alias) == singular(&table) {
        return true;
    }
    alias.len() >= 3 && table.contains(&alias)
}

fn acronym(table: &str) -> String {
    table
        .split('_')
        .filter_map(|word| word.chars().next())
        .collect()
}

fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["ses", "xes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
