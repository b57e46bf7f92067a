//! Canonical form for SQL expressions.
//!
//! Catalogs hand expressions back reformatted: SQL Server wraps defaults in
//! parentheses, Postgres appends casts and re-quotes identifiers, everyone
//! disagrees on keyword case. Both sides of a comparison go through
//! [`normalize`], which is a fixpoint iteration and therefore idempotent.

use super::DialectKind;

/// Upper-cased wherever they appear outside quotes.
const KEYWORDS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_USER",
    "LOCALTIMESTAMP",
    "LOCALTIME",
    "NULL",
    "TRUE",
    "FALSE",
    "AND",
    "OR",
    "NOT",
    "IN",
    "IS",
    "LIKE",
    "BETWEEN",
    "ANY",
    "ALL",
    "ARRAY",
    "CASE",
    "WHEN",
    "THEN",
    "ELSE",
    "END",
    "AS",
    "WITH",
];

/// Identifiers that must stay quoted on Postgres.
const RESERVED: &[&str] = &[
    "user",
    "order",
    "group",
    "table",
    "select",
    "from",
    "where",
    "default",
    "check",
    "primary",
    "references",
    "column",
    "constraint",
    "limit",
    "offset",
];

/// Words that continue a multi-word type name after `::`.
const CAST_TYPE_WORDS: &[&str] = &["varying", "precision", "without", "with", "time", "zone"];

const MAX_PASSES: usize = 8;

pub(crate) fn normalize(raw: &str, kind: DialectKind) -> String {
    let postgres_family = matches!(kind, DialectKind::Postgres | DialectKind::Cockroach);
    let mut text = raw.trim().to_string();
    for _ in 0..MAX_PASSES {
        let mut next = strip_wrapping_parens(&text).to_string();
        if kind == DialectKind::Mysql {
            next = double_to_single_quotes(&next);
        }
        if postgres_family {
            next = strip_casts(&next);
            next = unquote_simple_identifiers(&next);
        }
        next = canonical_tokens(&next, postgres_family);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

/// Removes parentheses that wrap the whole expression, repeatedly.
///
/// `((0))` becomes `0`; `(a) + (b)` is left alone because the first
/// parenthesis closes before the end.
#[must_use]
pub fn strip_wrapping_parens(text: &str) -> &str {
    let mut current = text.trim();
    while current.starts_with('(') && current.ends_with(')') {
        match matching_paren(current, 0) {
            Some(close) if close == current.len() - 1 => {
                current = current[1..close].trim();
            }
            _ => break,
        }
    }
    current
}

/// Returns the byte index of the parenthesis closing the one at `open`.
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index just past the quoted run starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn double_to_single_quotes(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && skip_quoted(bytes, 0) == bytes.len() {
        let inner = text[1..text.len() - 1].replace("\"\"", "\"");
        return format!("'{}'", inner.replace('\'', "''"));
    }
    text.to_string()
}

fn strip_casts(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let end = skip_quoted(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                i = skip_cast_type(text, i + 2);
            }
            _ => {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    out
}

fn skip_cast_type(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = skip_spaces(bytes, start);
    if bytes.get(i) == Some(&b'"') {
        i = skip_quoted(bytes, i);
    } else {
        i = skip_word(bytes, i);
    }
    loop {
        let next = skip_spaces(bytes, i);
        let end = skip_word(bytes, next);
        if end > next && CAST_TYPE_WORDS.contains(&text[next..end].to_ascii_lowercase().as_str()) {
            i = end;
        } else {
            break;
        }
    }
    if bytes.get(i) == Some(&b'(') {
        if let Some(close) = matching_paren(text, i) {
            i = close + 1;
        }
    }
    while bytes.get(i) == Some(&b'[') && bytes.get(i + 1) == Some(&b']') {
        i += 2;
    }
    i
}

fn skip_spaces(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn skip_word(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
    {
        i += 1;
    }
    i
}

const fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

fn unquote_simple_identifiers(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                let end = skip_quoted(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'"' => {
                let end = skip_quoted(bytes, i);
                let terminated = end >= i + 2 && bytes[end - 1] == b'"';
                if terminated && is_simple_identifier(&text[i + 1..end - 1]) {
                    out.push_str(&text[i + 1..end - 1]);
                } else {
                    out.push_str(&text[i..end]);
                }
                i = end;
            }
            _ => {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    out
}

fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED.contains(&name)
        && !KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

/// Collapses whitespace, fixes keyword case, and lower-cases function names
/// (and, on Postgres, every unquoted identifier).
fn canonical_tokens(text: &str, fold_identifiers: bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' || b == b'`' {
            let end = skip_quoted(bytes, i);
            out.push_str(&text[i..end]);
            i = end;
        } else if b.is_ascii_whitespace() {
            i = skip_spaces(bytes, i);
            let next = bytes.get(i).copied();
            let glue = out.is_empty()
                || out.ends_with('(')
                || out.ends_with(' ')
                || matches!(next, None | Some(b')' | b','));
            if !glue {
                out.push(' ');
            }
        } else if b == b',' {
            while out.ends_with(' ') {
                out.pop();
            }
            out.push(',');
            i = skip_spaces(bytes, i + 1);
            if i < bytes.len() && bytes[i] != b')' {
                out.push(' ');
            }
        } else if b.is_ascii_alphabetic() || b == b'_' {
            let end = skip_word(bytes, i);
            let word = &text[i..end];
            let upper = word.to_ascii_uppercase();
            if KEYWORDS.contains(&upper.as_str()) {
                out.push_str(&upper);
            } else if bytes.get(end) == Some(&b'(') || fold_identifiers {
                out.push_str(&word.to_ascii_lowercase());
            } else {
                out.push_str(word);
            }
            i = end;
        } else {
            let ch_len = utf8_len(b);
            out.push_str(&text[i..i + ch_len]);
            i += ch_len;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pg(raw: &str) -> String {
        normalize(raw, DialectKind::Postgres)
    }

    #[test]
    fn strips_wrapping_parentheses_only_when_balanced() {
        assert_eq!(strip_wrapping_parens("((0))"), "0");
        assert_eq!(strip_wrapping_parens(" ( 'x' ) "), "'x'");
        assert_eq!(strip_wrapping_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parens("(')')"), "')'");
    }

    #[test]
    fn strips_postgres_casts() {
        assert_eq!(pg("'abc'::character varying"), "'abc'");
        assert_eq!(pg("'{}'::jsonb"), "'{}'");
        assert_eq!(pg("'2020-01-01'::timestamp without time zone"), "'2020-01-01'");
        assert_eq!(
            pg("((status)::text = ANY ((ARRAY['a'::character varying, 'b'::character varying])::text[]))"),
            "(status) = ANY ((ARRAY['a', 'b']))"
        );
    }

    #[test]
    fn keeps_cast_markers_inside_literals() {
        assert_eq!(pg("'a::b'"), "'a::b'");
    }

    #[test]
    fn canonicalizes_whitespace_and_case() {
        assert_eq!(pg("  now( )  "), "now()");
        assert_eq!(pg("current_timestamp"), "CURRENT_TIMESTAMP");
        assert_eq!(pg("\"age\"  >   0"), "age > 0");
        assert_eq!(pg("\"user\" IS NOT NULL"), "\"user\" IS NOT NULL");
        assert_eq!(
            normalize("COALESCE( a ,b )", DialectKind::Mysql),
            "coalesce(a, b)"
        );
        assert_eq!(normalize("Age > 0", DialectKind::Mysql), "Age > 0");
    }

    #[test]
    fn mysql_double_quoted_strings_become_single_quoted() {
        assert_eq!(normalize("\"it's\"", DialectKind::Mysql), "'it''s'");
    }

    #[test]
    fn literal_whitespace_is_preserved() {
        assert_eq!(pg("'two  spaces'"), "'two  spaces'");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ a-zA-Z0-9_(),:'\"=<>.]{0,40}") {
            for kind in DialectKind::ALL {
                let once = normalize(&raw, kind);
                let twice = normalize(&once, kind);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
