//! YAML helpers shared by the detectors and the template extractor.
//!
//! Detectors need the parsed document (`serde_yaml::Value`) to read facts such
//! as `kind` or `metadata.name`. The extractor needs something different: the
//! exact byte position of every scalar so it can swap a literal for a
//! placeholder while leaving the rest of the file untouched. Re-serializing a
//! `Value` would reorder keys and drop comments, so `scan_scalars` works on
//! the raw text with an indentation-based key stack instead. It understands
//! the block-style subset of YAML that deployment manifests are written in and
//! simply skips what it does not understand (flow collections, block scalars,
//! Go template directives).

use std::ops::Range;

use serde_yaml::Value;

/// Split a multi-document YAML text on `---` separator lines.
///
/// The separator lines themselves are not part of any document. A leading
/// separator produces an empty first document, which keeps document indexes
/// stable between the detector and the extractor.
pub fn split_documents(text: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content == "---" || content.starts_with("--- ") {
            documents.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&text[start..]);
    documents
}

/// Convert a scalar YAML value to its string form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Walk a chain of mapping keys.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Walk a chain of mapping keys and return the scalar found there as a string.
pub fn lookup_string(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path).and_then(scalar_to_string)
}

/// A scalar value located in YAML text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarSite {
    /// Mapping keys leading to the scalar, joined with `/`. List items are
    /// transparent: `images: [- newName: x]` yields `images/newName`.
    pub key_path: String,
    /// The scalar's literal content, without quotes.
    pub value: String,
    /// Byte range of the literal content in the scanned text.
    pub span: Range<usize>,
    /// Whether the scalar is a bare list item rather than a mapping value.
    pub list_item: bool,
}

/// Locate every plain or simply-quoted scalar in block-style YAML text.
pub fn scan_scalars(text: &str) -> Vec<ScalarSite> {
    let mut sites = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut block_indent: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim_start_matches(' ');
        let indent = content.len() - trimmed.len();

        if let Some(parent) = block_indent {
            if trimmed.trim().is_empty() || indent > parent {
                continue;
            }
            block_indent = None;
        }

        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if indent == 0 && (trimmed == "---" || trimmed.starts_with("--- ") || trimmed == "...") {
            stack.clear();
            continue;
        }

        let (rest, rest_col, list_item) = match strip_list_marker(trimmed) {
            Some((after, skipped)) => {
                stack.retain(|(level, _)| *level <= indent);
                (after, indent + skipped, true)
            }
            None => (trimmed, indent, false),
        };
        if rest.is_empty() || rest.starts_with('{') || rest.starts_with('[') {
            continue;
        }

        match split_key(rest) {
            Some((key, value_offset)) => {
                stack.retain(|(level, _)| *level < rest_col);
                let key_path = join_path(&stack, Some(&key));
                let raw_value = &rest[value_offset..];
                let value_col = rest_col + value_offset;

                match classify_value(raw_value) {
                    ValueShape::Empty => stack.push((rest_col, key)),
                    ValueShape::Block => block_indent = Some(rest_col),
                    ValueShape::Skip => {}
                    ValueShape::Scalar { literal, range } => sites.push(ScalarSite {
                        key_path,
                        value: literal,
                        span: line_start + value_col + range.start..line_start + value_col + range.end,
                        list_item: false,
                    }),
                }
            }
            None if list_item => {
                if let ValueShape::Scalar { literal, range } = classify_value(rest) {
                    sites.push(ScalarSite {
                        key_path: join_path(&stack, None),
                        value: literal,
                        span: line_start + rest_col + range.start..line_start + rest_col + range.end,
                        list_item: true,
                    });
                }
            }
            None => {}
        }
    }

    sites
}

fn strip_list_marker(trimmed: &str) -> Option<(&str, usize)> {
    if trimmed == "-" {
        return Some(("", 1));
    }
    let after = trimmed.strip_prefix("- ")?;
    let inner = after.trim_start_matches(' ');
    Some((inner, trimmed.len() - inner.len()))
}

fn join_path(stack: &[(usize, String)], leaf: Option<&str>) -> String {
    stack
        .iter()
        .map(|(_, key)| key.as_str())
        .chain(leaf)
        .collect::<Vec<_>>()
        .join("/")
}

/// Split `key: value` and return the key plus the byte offset of the value.
fn split_key(rest: &str) -> Option<(String, usize)> {
    let (key, after_key) = if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = rest[1..].find(quote)? + 1;
        (rest[1..close].to_string(), close + 1)
    } else {
        let colon = find_mapping_colon(rest)?;
        (rest[..colon].trim_end().to_string(), colon)
    };

    let tail = &rest[after_key..];
    let tail = tail.strip_prefix(':')?;
    if !(tail.is_empty() || tail.starts_with(' ')) {
        return None;
    }
    if key.is_empty() || key.contains("{{") {
        return None;
    }

    let value_start = rest.len() - tail.trim_start_matches(' ').len();
    Some((key, value_start))
}

fn find_mapping_colon(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    (0..bytes.len()).find(|&i| bytes[i] == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' '))
}

enum ValueShape {
    Empty,
    Block,
    Skip,
    Scalar { literal: String, range: Range<usize> },
}

fn classify_value(raw: &str) -> ValueShape {
    let mut raw = raw;
    let mut skipped = 0;
    if raw.starts_with('&') {
        let end = raw.find(' ').unwrap_or(raw.len());
        let after = raw[end..].trim_start_matches(' ');
        skipped = raw.len() - after.len();
        raw = after;
    }

    if raw.is_empty() || raw.starts_with('#') {
        return ValueShape::Empty;
    }
    if raw.starts_with('|') || raw.starts_with('>') {
        return ValueShape::Block;
    }
    if raw.starts_with('{') || raw.starts_with('[') || raw.starts_with('*') || raw.starts_with('!') {
        return ValueShape::Skip;
    }

    let shifted = |range: Range<usize>| range.start + skipped..range.end + skipped;

    if let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let inner = &raw[1..];
        let Some(close) = inner.find(quote) else {
            return ValueShape::Skip;
        };
        let literal = &inner[..close];
        let escaped = if quote == '"' {
            literal.contains('\\')
        } else {
            inner[close + 1..].starts_with('\'')
        };
        if escaped || literal.contains("{{") {
            return ValueShape::Skip;
        }
        return ValueShape::Scalar {
            literal: literal.to_string(),
            range: shifted(1..1 + close),
        };
    }

    let end = raw.find(" #").unwrap_or(raw.len());
    let literal = raw[..end].trim_end();
    if literal.is_empty() || literal.contains("{{") {
        return ValueShape::Skip;
    }
    ValueShape::Scalar {
        literal: literal.to_string(),
        range: shifted(0..literal.len()),
    }
}
