//! Codec for line-oriented `key=value` settings files.
//!
//! File layout:
//! ```text
//! #Changed config settings(single)
//! SkipKnown=true
//! UpdateFrequency=AVG
//! ```
//!
//! - The first line written is a `#` comment naming the operation that last
//!   wrote the file.  Parsing ignores every blank line and every line whose
//!   first non-blank character is `#` or `!`.
//! - A key ends at the first unescaped `=`, `:` or whitespace.  Whitespace
//!   around the separator is dropped; the rest of the line is the value.
//! - A line ending in an odd number of backslashes continues on the next
//!   line, whose leading whitespace is dropped.
//! - Escapes: `\t`, `\n`, `\r`, `\f`, `\uXXXX`, and `\c` for any other `c`.
//!
//! Entries are written in ascending key order, so two writes of the same map
//! produce identical files.  Any string key and value, including empty ones,
//! survive a write/parse cycle unchanged.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors that can occur while parsing a settings file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A `\u` escape is not followed by four hex digits.
    #[error("malformed \\uXXXX escape on line {line}")]
    MalformedUnicodeEscape { line: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses settings file text into an ordered map.
///
/// Later occurrences of a key override earlier ones.
///
/// # Errors
///
/// Returns [`PropertiesError::MalformedUnicodeEscape`] if a `\u` escape is
/// truncated or not hexadecimal.
///
/// # Examples
///
/// ```rust
/// use kwsearch_core::properties::parse_properties;
///
/// let map = parse_properties("#header\nSkipKnown=true\n").unwrap();
/// assert_eq!(map.get("SkipKnown").map(String::as_str), Some("true"));
/// ```
pub fn parse_properties(text: &str) -> Result<BTreeMap<String, String>, PropertiesError> {
    let mut entries = BTreeMap::new();
    for (line_no, logical) in logical_lines(text) {
        let (raw_key, raw_value) = split_key_value(&logical);
        let key = unescape(raw_key, line_no)?;
        let value = unescape(raw_value, line_no)?;
        entries.insert(key, value);
    }
    Ok(entries)
}

/// Serializes `entries` with a leading `#comment` header line.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use kwsearch_core::properties::write_properties;
///
/// let mut map = BTreeMap::new();
/// map.insert("UpdateFrequency".to_string(), "AVG".to_string());
/// assert_eq!(write_properties("", &map), "#\nUpdateFrequency=AVG\n");
/// ```
pub fn write_properties(comment: &str, entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for line in comment.split('\n') {
        out.push('#');
        out.push_str(line.trim_end_matches('\r'));
        out.push('\n');
    }
    for (key, value) in entries {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Joins continuation lines and drops comments and blank lines.
///
/// Yields `(1-based line number of the first physical line, logical line)`.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut physical = text.split('\n').enumerate();

    while let Some((index, line)) = physical.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_odd_backslashes(&logical) {
            logical.pop();
            match physical.next() {
                Some((_, next)) => {
                    let next = next.strip_suffix('\r').unwrap_or(next);
                    logical.push_str(next.trim_start_matches(is_blank));
                }
                None => break,
            }
        }
        out.push((index + 1, logical));
    }
    out
}

fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

/// Splits a logical line into its still-escaped key and value parts.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '=' || c == ':' {
            key_end = i;
            value_start = i + 1;
            break;
        }
        if is_blank(c) {
            key_end = i;
            let rest = &line[i..];
            let after_blank = rest.trim_start_matches(is_blank);
            let mut start = line.len() - after_blank.len();
            if after_blank.starts_with('=') || after_blank.starts_with(':') {
                start += 1;
            }
            value_start = start;
            break;
        }
    }

    let key = &line[..key_end];
    let value = line[value_start..].trim_start_matches(is_blank);
    (key, value)
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or(PropertiesError::MalformedUnicodeEscape { line })?;
                out.push(code);
            }
            Some(other) => out.push(other),
            // A lone trailing backslash is dropped.
            None => {}
        }
    }
    Ok(out)
}

// ── Serialization ─────────────────────────────────────────────────────────────

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = "#Changed config settings(single)\n\n! bang comment\n   # indented\nSkipKnown=true\n";
        assert_eq!(parse_properties(text).unwrap(), map(&[("SkipKnown", "true")]));
    }

    #[test]
    fn test_parse_accepts_colon_and_whitespace_separators() {
        let text = "a:1\nb 2\nc = 3\nd\n";
        assert_eq!(
            parse_properties(text).unwrap(),
            map(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "")])
        );
    }

    #[test]
    fn test_parse_handles_crlf_line_endings() {
        let text = "#x\r\nLATIN_1=true\r\nGREEK=false\r\n";
        assert_eq!(
            parse_properties(text).unwrap(),
            map(&[("GREEK", "false"), ("LATIN_1", "true")])
        );
    }

    #[test]
    fn test_parse_joins_continuation_lines() {
        let text = "key=first \\\n    second\n";
        assert_eq!(parse_properties(text).unwrap(), map(&[("key", "first second")]));
    }

    #[test]
    fn test_parse_even_backslashes_do_not_continue() {
        let text = "path=C:\\\\\nnext=1\n";
        assert_eq!(
            parse_properties(text).unwrap(),
            map(&[("next", "1"), ("path", "C:\\")])
        );
    }

    #[test]
    fn test_parse_decodes_unicode_escape() {
        assert_eq!(
            parse_properties("k=caf\\u00e9\n").unwrap(),
            map(&[("k", "café")])
        );
    }

    #[test]
    fn test_parse_rejects_truncated_unicode_escape() {
        assert_eq!(
            parse_properties("#h\nk=\\u12\n"),
            Err(PropertiesError::MalformedUnicodeEscape { line: 2 })
        );
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        assert_eq!(parse_properties("k=1\nk=2\n").unwrap(), map(&[("k", "2")]));
    }

    #[test]
    fn test_write_emits_header_then_sorted_entries() {
        let text = write_properties("Changed config settings(batch)", &map(&[("b", "2"), ("a", "1")]));
        assert_eq!(text, "#Changed config settings(batch)\na=1\nb=2\n");
    }

    #[test]
    fn test_awkward_keys_and_values_survive_write_and_parse() {
        // Arrange: separators, comment markers, whitespace, empties, escapes.
        let entries = map(&[
            ("", ""),
            ("empty", ""),
            ("a=b", "c=d"),
            ("x:y", ":z"),
            ("#not-a-comment", "!nor-this"),
            ("with space", "  leading and trailing  "),
            ("tab\tkey", "line1\nline2\r\n"),
            ("back\\slash", "ends with \\"),
            ("unicode-é", "日本語"),
            ("ctl", "\u{1}"),
        ]);

        // Act
        let text = write_properties("", &entries);
        let parsed = parse_properties(&text).unwrap();

        // Assert
        assert_eq!(parsed, entries);
    }
}
