//! Helpers for reading stored `CREATE` statements.
//!
//! Only as much of the grammar is understood as the introspectors need:
//! quoting, balanced parentheses and top-level comma lists.

/// Byte index just past the quoted token starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let close = match bytes[start] {
        b'[' => b']',
        other => other,
    };
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if close != b']' && bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

const fn is_quote(byte: u8) -> bool {
    matches!(byte, b'\'' | b'"' | b'`' | b'[')
}

/// Splits `text` on `separator` where it is outside quotes and parentheses.
pub(crate) fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if is_quote(byte) {
            i = skip_quoted(bytes, i);
            continue;
        }
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if byte == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// The parenthesised group opening at `open`, without its parentheses, and
/// the byte index just past its closing parenthesis.
pub(crate) fn balanced_group(text: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let byte = bytes[i];
        if is_quote(byte) {
            i = skip_quoted(bytes, i);
            continue;
        }
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..i], i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// The element list of a `CREATE TABLE` statement and whatever follows it
/// (`WITHOUT ROWID`, `STRICT`).
pub(crate) fn table_body(sql: &str) -> Option<(&str, &str)> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if is_quote(bytes[i]) {
            i = skip_quoted(bytes, i);
            continue;
        }
        if bytes[i] == b'(' {
            let (body, end) = balanced_group(sql, i)?;
            return Some((body, &sql[end..]));
        }
        i += 1;
    }
    None
}

/// Copy of `text` with the contents of quotes and parentheses replaced by
/// `x`, delimiters kept. Byte offsets carry over to the original, so
/// keyword regexes can run on the mask and slices can be cut from `text`.
pub(crate) fn mask(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut masked = Vec::with_capacity(bytes.len());
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if is_quote(byte) {
            let end = skip_quoted(bytes, i);
            if depth > 0 {
                masked.extend(std::iter::repeat(b'x').take(end - i));
            } else {
                masked.push(byte);
                let inner_end = if end > i + 1 { end - 1 } else { end };
                masked.extend(std::iter::repeat(b'x').take(inner_end.saturating_sub(i + 1)));
                if end > i + 1 {
                    masked.push(bytes[end - 1]);
                }
            }
            i = end;
            continue;
        }
        match byte {
            b'(' => {
                masked.push(if depth == 0 { b'(' } else { b'x' });
                depth += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                masked.push(if depth == 0 { b')' } else { b'x' });
            }
            _ if depth > 0 => masked.push(b'x'),
            _ => masked.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&masked).into_owned()
}

/// Removes identifier quoting, undoubling escaped quotes.
pub(crate) fn unquote_identifier(raw: &str) -> String {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        let closing = match first {
            b'[' => Some(b']'),
            b'"' | b'`' | b'\'' => Some(first),
            _ => None,
        };
        if closing == Some(last) {
            let inner = &raw[1..raw.len() - 1];
            return match first {
                b'[' => inner.to_string(),
                quote => {
                    let quote = char::from(quote).to_string();
                    inner.replace(&quote.repeat(2), &quote)
                }
            };
        }
    }
    raw.to_string()
}

/// Reads `("a", "b")` or `"a", "b"` into unquoted names.
pub(crate) fn identifier_list(text: &str) -> Vec<String> {
    let text = text.trim();
    let inner = balanced_group(text, 0).map_or(text, |(inner, _)| inner);
    split_top_level(inner, b',')
        .into_iter()
        .map(unquote_identifier)
        .collect()
}

/// Splits a leading identifier (quoted or bare) off `text`.
pub(crate) fn leading_identifier(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let first = *bytes.first()?;
    let end = if is_quote(first) {
        skip_quoted(bytes, 0)
    } else {
        bytes
            .iter()
            .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$'))
            .unwrap_or(bytes.len())
    };
    if end == 0 {
        return None;
    }
    Some((unquote_identifier(&text[..end]), &text[end..]))
}

/// Reads a quoted string literal list such as `'a', 'it''s'`.
pub(crate) fn literal_list(text: &str) -> Option<Vec<String>> {
    split_top_level(text, b',')
        .into_iter()
        .map(|item| {
            let item = item.trim();
            (item.len() >= 2 && item.starts_with('\'') && item.ends_with('\''))
                .then(|| item[1..item.len() - 1].replace("''", "'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_outside_quotes_and_parentheses() {
        let parts = split_top_level(
            "\"id\" integer, \"price\" decimal(10, 2), CHECK (\"a\" IN ('x,y', 'z')), \"we,ird\" text",
            b',',
        );
        assert_eq!(
            parts,
            vec![
                "\"id\" integer",
                "\"price\" decimal(10, 2)",
                "CHECK (\"a\" IN ('x,y', 'z'))",
                "\"we,ird\" text",
            ]
        );
    }

    #[test]
    fn table_body_and_tail() {
        let (body, tail) =
            table_body("CREATE TABLE \"odd (name\" (\"id\" integer, PRIMARY KEY (\"id\")) WITHOUT ROWID")
                .unwrap();
        assert_eq!(body, "\"id\" integer, PRIMARY KEY (\"id\")");
        assert_eq!(tail.trim(), "WITHOUT ROWID");
    }

    #[test]
    fn identifiers_lose_their_quotes() {
        assert_eq!(unquote_identifier("\"say \"\"hi\"\"\""), "say \"hi\"");
        assert_eq!(unquote_identifier("[order]"), "order");
        assert_eq!(unquote_identifier("`tick`"), "tick");
        assert_eq!(unquote_identifier("plain"), "plain");
        assert_eq!(identifier_list("(\"a\", b ,[c])"), vec!["a", "b", "c"]);
    }

    #[test]
    fn leading_identifier_splits_name_from_rest() {
        let (name, rest) = leading_identifier("\"first name\" varchar(20) NOT NULL").unwrap();
        assert_eq!(name, "first name");
        assert_eq!(rest.trim(), "varchar(20) NOT NULL");
        let (name, _) = leading_identifier("id integer").unwrap();
        assert_eq!(name, "id");
    }

    #[test]
    fn balanced_group_skips_nested_and_quoted_parentheses() {
        let text = "AS (a || ')' || (b)) STORED";
        let (inner, end) = balanced_group(text, 3).unwrap();
        assert_eq!(inner, "a || ')' || (b)");
        assert_eq!(text[end..].trim(), "STORED");
    }

    #[test]
    fn mask_keeps_offsets_and_hides_nested_text() {
        let text = "\"na me\" text DEFAULT ('NOT NULL') CHECK (a IN ('x'))";
        let masked = mask(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked, "\"xxxxx\" text DEFAULT (xxxxxxxxxx) CHECK (xxxxxxxxxx)");
        assert!(!masked.contains("NOT NULL"));
    }

    #[test]
    fn literal_lists() {
        assert_eq!(
            literal_list("'new', 'it''s done'").unwrap(),
            vec!["new", "it's done"]
        );
        assert!(literal_list("'a', b").is_none());
    }
}
