//! Catalog text format.
//!
//! Reading goes through `serde_yaml`. Writing uses a small emitter of its
//! own because the output has to be stable for line-oriented diffs:
//!
//! - block style, two-space indentation, no line wrapping
//! - string scalars single-quoted (`'` doubled); strings with line breaks
//!   or other control characters double-quoted with escapes
//! - keys plain unless they would read back as something else
//! - `~` for null, `{}` and `[]` for empty collections
//! - `__metadata__` first, then entries in catalog order, entry fields in
//!   [`CatalogEntry::ordered_fields`] order

use super::entry::{Catalog, CatalogEntry};
use crate::config::CatalogConfig;
use crate::error::{CivitError, Result};
use crate::metadata::atomic_write;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;
use std::path::Path;

/// Parse catalog text. `origin` is only used in error messages.
///
/// An empty or null document is an empty catalog.
pub fn parse_catalog(text: &str, origin: &Path) -> Result<Catalog> {
    let invalid = |message: String| CivitError::InvalidCatalog {
        path: origin.to_path_buf(),
        message,
    };

    if text.trim().is_empty() {
        return Ok(Catalog::new());
    }

    let document: Value = serde_yaml::from_str(text).map_err(|e| CivitError::Yaml {
        message: format!("Failed to parse {}: {}", origin.display(), e),
        source: Some(e),
    })?;

    let mapping = match document {
        Value::Null => return Ok(Catalog::new()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(invalid(format!(
                "expected a mapping at the top level, found {}",
                type_name(&other)
            )))
        }
    };

    let mut catalog = Catalog::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(key) => key,
            other => return Err(invalid(format!("non-string key {:?}", other))),
        };

        if key == CatalogConfig::METADATA_KEY {
            catalog.metadata = Some(value);
            continue;
        }

        let fields = match value {
            Value::Mapping(fields) => entry_fields(fields)
                .map_err(|message| invalid(format!("entry '{}': {}", key, message)))?,
            other => {
                return Err(invalid(format!(
                    "entry '{}' is {}, expected a mapping",
                    key,
                    type_name(&other)
                )))
            }
        };
        catalog.insert(key, CatalogEntry::from_fields(fields));
    }

    Ok(catalog)
}

fn entry_fields(mapping: Mapping) -> std::result::Result<IndexMap<String, Value>, String> {
    mapping
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key, value)),
            other => Err(format!("non-string field name {:?}", other)),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Read and parse a catalog file.
pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path).map_err(|e| CivitError::io_with_path(e, path))?;
    parse_catalog(&text, path)
}

/// Serialize and atomically replace a catalog file.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    atomic_write(path, to_yaml_string(catalog).as_bytes())
}

/// Serialize a catalog.
pub fn to_yaml_string(catalog: &Catalog) -> String {
    let mut out = String::new();

    if let Some(metadata) = &catalog.metadata {
        out.push_str(&format_key(CatalogConfig::METADATA_KEY));
        out.push(':');
        write_value(&mut out, metadata, 0);
    }

    for (key, entry) in catalog.iter() {
        out.push_str(&format_key(key));
        out.push(':');
        let fields = entry.ordered_fields();
        if fields.is_empty() {
            out.push_str(" {}\n");
            continue;
        }
        out.push('\n');
        for (field, value) in fields {
            push_indent(&mut out, 2);
            out.push_str(&format_key(field));
            out.push(':');
            write_value(&mut out, value, 2);
        }
    }

    if out.is_empty() {
        out.push_str("{}\n");
    }
    out
}

/// Write `value` right after a `key:` or `-` at `indent`.
fn write_value(out: &mut String, value: &Value, indent: usize) {
    match value {
        Value::Mapping(mapping) if !mapping.is_empty() => {
            out.push('\n');
            write_mapping(out, mapping, indent + 2, false);
        }
        Value::Sequence(items) if !items.is_empty() => {
            out.push('\n');
            write_sequence(out, items, indent + 2);
        }
        Value::Tagged(tagged) => {
            let _ = write!(out, " {}", tagged.tag);
            write_value(out, &tagged.value, indent);
        }
        scalar => {
            out.push(' ');
            out.push_str(&format_scalar(scalar));
            out.push('\n');
        }
    }
}

/// Write mapping entries at `indent`. With `inline_first` the first key
/// continues the current line (after `- `).
fn write_mapping(out: &mut String, mapping: &Mapping, indent: usize, mut inline_first: bool) {
    for (key, value) in mapping {
        if inline_first {
            inline_first = false;
        } else {
            push_indent(out, indent);
        }
        match key {
            Value::String(key) => out.push_str(&format_key(key)),
            other => out.push_str(&format_scalar(other)),
        }
        out.push(':');
        write_value(out, value, indent);
    }
}

fn write_sequence(out: &mut String, items: &[Value], indent: usize) {
    for item in items {
        push_indent(out, indent);
        out.push('-');
        match item {
            Value::Mapping(mapping) if !mapping.is_empty() => {
                out.push(' ');
                write_mapping(out, mapping, indent + 2, true);
            }
            _ => write_value(out, item, indent),
        }
    }
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

/// Inline form of a scalar or empty collection.
fn format_scalar(value: &Value) -> String {
    match value {
        Value::Null => "~".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        Value::Sequence(_) => "[]".to_string(),
        Value::Mapping(_) => "{}".to_string(),
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, format_scalar(&tagged.value)),
    }
}

/// Single-quote a string, or double-quote it when it holds control
/// characters that single quotes cannot carry.
pub fn quote_string(s: &str) -> String {
    if s.chars().any(char::is_control) {
        return double_quote(s);
    }
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Plain key when it reads back as the same string, quoted otherwise.
pub fn format_key(key: &str) -> String {
    if is_plain_safe(key) {
        key.to_string()
    } else {
        quote_string(key)
    }
}

fn is_plain_safe(s: &str) -> bool {
    const LEADING_INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];
    const FLOW_INDICATORS: &[char] = &[',', '[', ']', '{', '}'];

    let Some(first) = s.chars().next() else {
        return false;
    };
    if first.is_whitespace() || s.ends_with(char::is_whitespace) {
        return false;
    }
    if LEADING_INDICATORS.contains(&first) {
        return false;
    }
    if s.chars().any(|c| c.is_control() || FLOW_INDICATORS.contains(&c)) {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    !resolves_to_non_string(s)
}

/// Whether a plain scalar would be read as null, bool or number.
fn resolves_to_non_string(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "~" | "null" | "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n"
    ) {
        return true;
    }
    let unsigned = lower.trim_start_matches(['+', '-']);
    if matches!(unsigned, ".inf" | ".nan") {
        return true;
    }
    if unsigned.starts_with("0x") || unsigned.starts_with("0o") || unsigned.starts_with("0b") {
        return true;
    }
    s.parse::<f64>().is_ok()
}
