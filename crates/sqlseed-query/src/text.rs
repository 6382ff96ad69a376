//! Quote- and parenthesis-aware scanning over SQL text.
//!
//! Everything here works on byte offsets of normalized text. Keyword
//! matches are ASCII, so offsets returned are always char boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED_IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"`(\w+)`|"(\w+)"|\[(\w+)\]"#).expect("valid quoted identifier regex")
});

/// Clause keywords that terminate a WHERE clause.
pub const WHERE_TERMINATORS: &[&str] = &[
    "ORDER BY", "GROUP BY", "HAVING", "LIMIT", "UNION", "FETCH", "OFFSET", "WINDOW",
];

/// Keywords that terminate a JOIN ... ON condition.
pub const ON_TERMINATORS: &[&str] = &[
    "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "FULL", "CROSS", "NATURAL", "STRAIGHT_JOIN",
    "WHERE", "ORDER BY", "GROUP BY", "HAVING", "LIMIT", "UNION", "FETCH", "OFFSET",
];

/// Strip comments, unquote simple identifiers and collapse whitespace
/// outside string literals. A trailing `;` is dropped.
pub fn normalize_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_quote = false;
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        if in_quote {
            out.push(ch);
            if ch == '\'' {
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    in_quote = false;
                }
            }
            continue;
        }

        match ch {
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
                pending_space = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                pending_space = true;
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                if c == '\'' {
                    in_quote = true;
                }
                out.push(c);
            }
        }
    }

    let trimmed = out.trim().trim_end_matches(';').trim_end();
    unquote_identifiers(trimmed)
}

/// Drop identifier quotes found outside string literals.
fn unquote_identifiers(text: &str) -> String {
    let masked = mask_literals(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in QUOTED_IDENT_RE.captures_iter(&masked) {
        let (Some(whole), Some(inner)) = (
            caps.get(0),
            caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)),
        ) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&text[inner.range()]);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Copy of `text` with string literal contents replaced by `_`.
///
/// Byte offsets line up with the input, so matches found on the mask can
/// be sliced out of the original.
pub fn mask_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quote = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quote {
            if ch == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push_str("__");
                    continue;
                }
                in_quote = false;
                out.push('\'');
            } else {
                for _ in 0..ch.len_utf8() {
                    out.push('_');
                }
            }
            continue;
        }
        if ch == '\'' {
            in_quote = true;
        }
        out.push(ch);
    }

    out
}

/// Find the first keyword from `keywords` at nesting depth zero relative to `from`.
///
/// Scanning stops at an unbalanced `)`, which closes the enclosing subquery.
pub fn find_top_level(text: &str, from: usize, keywords: &[&str]) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut idx = from;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if in_quote {
            if byte == b'\'' {
                in_quote = false;
            }
            idx += 1;
            continue;
        }
        match byte {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ if depth == 0 => {
                for keyword in keywords {
                    if keyword_at(text, idx, keyword) {
                        return Some((idx, idx + keyword.len()));
                    }
                }
            }
            _ => {}
        }
        idx += 1;
    }

    None
}

/// End offset of the region starting at `from` that stays at depth zero.
pub fn region_end(text: &str, from: usize, terminators: &[&str]) -> usize {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut idx = from;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if in_quote {
            if byte == b'\'' {
                in_quote = false;
            }
            idx += 1;
            continue;
        }
        match byte {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return idx;
                }
            }
            _ if depth == 0 => {
                if terminators.iter().any(|keyword| keyword_at(text, idx, keyword)) {
                    return idx;
                }
            }
            _ => {}
        }
        idx += 1;
    }

    bytes.len()
}

/// True when `keyword` occurs at `idx` as a whole word, ignoring case.
pub fn keyword_at(text: &str, idx: usize, keyword: &str) -> bool {
    let bytes = text.as_bytes();
    let end = idx + keyword.len();
    if end > bytes.len() || !bytes[idx..end].eq_ignore_ascii_case(keyword.as_bytes()) {
        return false;
    }
    let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
    let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
    before_ok && after_ok
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Given the offset of an opening `(`, return the offset of its matching `)`.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0_i32;
    let mut in_quote = false;
    for (idx, byte) in bytes.iter().enumerate().skip(open) {
        if in_quote {
            if *byte == b'\'' {
                in_quote = false;
            }
            continue;
        }
        match byte {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on a keyword (e.g. `AND`, `,`) at depth zero, outside literals.
pub fn split_top_level<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let word_separator = separator.bytes().all(|b| b.is_ascii_alphabetic());
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut in_quote = false;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if in_quote {
            if byte == b'\'' {
                in_quote = false;
            }
            idx += 1;
            continue;
        }
        match byte {
            b'\'' => in_quote = true,
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 => {
                let matched = if word_separator {
                    keyword_at(text, idx, separator)
                } else {
                    text[idx..].starts_with(separator)
                };
                if matched {
                    parts.push(text[start..idx].trim());
                    idx += separator.len();
                    start = idx;
                    continue;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    parts.push(text[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

/// Remove surrounding quotes and undo `''` escaping.
pub fn unquote(literal: &str) -> String {
    let trimmed = literal.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_comments_and_whitespace() {
        let sql = "SELECT *\n  FROM users u -- trailing\n /* block\n comment */ WHERE u.name = 'a  b';";
        assert_eq!(
            normalize_sql(sql),
            "SELECT * FROM users u WHERE u.name = 'a  b'"
        );
    }

    #[test]
    fn normalize_keeps_comment_markers_inside_literals() {
        let sql = "SELECT 1 FROM t WHERE t.note = '--not a comment'";
        assert!(normalize_sql(sql).ends_with("'--not a comment'"));
    }

    #[test]
    fn normalize_unquotes_identifiers() {
        assert_eq!(
            normalize_sql("SELECT * FROM `users` u WHERE u.\"email\" = 'x'"),
            "SELECT * FROM users u WHERE u.email = 'x'"
        );
    }

    #[test]
    fn normalize_leaves_quotes_inside_literals() {
        assert_eq!(
            normalize_sql("SELECT * FROM \"users\" u WHERE u.status = '\"vip\"' AND u.tag = '[x]'"),
            "SELECT * FROM users u WHERE u.status = '\"vip\"' AND u.tag = '[x]'"
        );
    }

    #[test]
    fn mask_preserves_offsets() {
        let text = "a = 'héllo' AND b = 'it''s'";
        let masked = mask_literals(text);
        assert_eq!(masked.len(), text.len());
        assert!(!masked.contains("llo"));
        assert!(masked.contains("AND b ="));
    }

    #[test]
    fn top_level_search_skips_subqueries_and_literals() {
        let text = "x IN (SELECT a FROM t ORDER BY a) AND y = 'ORDER BY' ORDER BY z";
        let (start, _) = find_top_level(text, 0, WHERE_TERMINATORS).expect("found");
        assert_eq!(&text[start..], "ORDER BY z");
    }

    #[test]
    fn split_respects_between_parentheses() {
        let parts = split_top_level("a = 1 AND (b = 2 AND c = 3) AND d = 'x AND y'", "AND");
        assert_eq!(parts, vec!["a = 1", "(b = 2 AND c = 3)", "d = 'x AND y'"]);
    }
}
