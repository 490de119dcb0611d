//! Placeholder parsing and substitution.
//!
//! Template bodies are plain text with `${name}` placeholders. `$${` stands
//! for a literal `${`, which is how extraction protects text that already
//! looked like a placeholder in the source. Anything else, including Helm's
//! `{{ ... }}` directives, is copied through untouched.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// A parsed piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Whether `name` is usable as a placeholder name.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// The placeholder text for `name`.
pub fn placeholder(name: &str) -> String {
    format!("${{{}}}", name)
}

/// Escape text so that it renders back to itself.
pub fn escape_literal(text: &str) -> String {
    text.replace("${", "$${")
}

/// Split template text into literal and variable segments.
pub fn parse(text: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(found) = text[pos..].find('$') {
        let dollar = pos + found;
        let rest = &text[dollar..];

        if rest.starts_with("$${") {
            // Keep "${" and drop the escaping dollar.
            push_literal(&mut segments, &text[literal_start..dollar]);
            literal_start = dollar + 1;
            pos = dollar + 3;
        } else if rest.starts_with("${") {
            let Some(close) = rest.find('}') else {
                return Err(Error::Render {
                    message: format!("unterminated placeholder '{}'", truncate(rest)),
                    variable: None,
                });
            };
            let name = &rest[2..close];
            if !is_variable_name(name) {
                return Err(Error::Render {
                    message: format!("malformed placeholder '{}'", &rest[..=close]),
                    variable: None,
                });
            }
            push_literal(&mut segments, &text[literal_start..dollar]);
            segments.push(Segment::Variable(name));
            pos = dollar + close + 1;
            literal_start = pos;
        } else {
            pos = dollar + 1;
        }
    }
    push_literal(&mut segments, &text[literal_start..]);
    Ok(segments)
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, literal: &'a str) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
}

fn truncate(text: &str) -> &str {
    let line = text.lines().next().unwrap_or(text);
    match line.char_indices().nth(40) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Names of every variable referenced in `text`.
pub fn placeholders(text: &str) -> Result<BTreeSet<String>> {
    Ok(parse(text)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.to_string()),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Render `text`, asking `lookup` for the value of every variable.
///
/// A variable `lookup` has no value for is an error naming it; nothing is
/// ever replaced with an empty string implicitly.
pub fn render_with<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    for segment in parse(text)? {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Variable(name) => match lookup(name) {
                Some(value) => out.push_str(&value),
                None => return Err(Error::missing_variable(name, None)),
            },
        }
    }
    Ok(out)
}
