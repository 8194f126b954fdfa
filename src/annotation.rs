//! Struct tag model.
//!
//! A tag is an ordered list of `key:"value"` pairs separated by spaces, the
//! convention `reflect.StructTag` understands. Values are kept opaque: an
//! update replaces a whole entry and never looks inside `name,omitempty`.

use crate::quote;
use std::fmt;
use thiserror::Error;

/// One `key:"value"` pair. `value` is stored decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEntry {
    pub key: String,
    pub value: String,
}

impl AnnotationEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered tag entries with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    entries: Vec<AnnotationEntry>,
}

/// Why a tag string could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("bad syntax for struct tag key")]
    Key,
    #[error("bad syntax for struct tag pair")]
    Pair,
    #[error("bad syntax for struct tag value")]
    Value,
}

/// How a tag literal is delimited in Go source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    /// `` `json:"id"` ``
    Raw,
    /// `"json:\"id\""`
    Interpreted,
}

impl AnnotationSet {
    /// Parse tag content (without the outer literal delimiters).
    ///
    /// A key repeated within `raw` keeps its first occurrence and later
    /// copies are dropped, matching what a struct tag lookup reads. The
    /// result never holds duplicate keys.
    pub fn parse(raw: &str) -> Result<Self, SyntaxError> {
        let mut set = Self::default();
        let mut rest = raw;

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }

            let bytes = rest.as_bytes();
            let key_len = bytes
                .iter()
                .take_while(|&&b| b > b' ' && b != b':' && b != b'"' && b != 0x7f)
                .count();
            if key_len == 0 {
                return Err(SyntaxError::Key);
            }
            if key_len + 1 >= bytes.len() || bytes[key_len] != b':' {
                return Err(SyntaxError::Pair);
            }
            if bytes[key_len + 1] != b'"' {
                return Err(SyntaxError::Value);
            }

            // Scan to the closing quote, stepping over escapes.
            let open = key_len + 1;
            let mut i = open + 1;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= bytes.len() {
                return Err(SyntaxError::Value);
            }

            let value = quote::unquote(&rest[open..=i]).ok_or(SyntaxError::Value)?;
            let key = &rest[..key_len];
            if !set.entries.iter().any(|e| e.key == key) {
                set.entries.push(AnnotationEntry::new(key, value));
            }
            rest = &rest[i + 1..];
        }

        Ok(set)
    }

    /// Replace the entry with the same key in place, or append.
    pub fn set(&mut self, entry: AnnotationEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => existing.value = entry.value,
            None => self.entries.push(entry),
        }
    }

    /// Fold every entry of `update` into `self`, in `update`'s order.
    pub fn merge(&mut self, update: &AnnotationSet) {
        for entry in &update.entries {
            self.set(entry.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationEntry> {
        self.entries.iter()
    }

    /// Render back to `key:"value"` form, space-joined.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AnnotationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", entry.key, quote::quote(&entry.value))?;
        }
        Ok(())
    }
}

/// Strip one pair of surrounding backticks from a fragment, if present.
pub fn strip_backticks(fragment: &str) -> &str {
    if fragment.len() > 2 && fragment.starts_with('`') && fragment.ends_with('`') {
        &fragment[1..fragment.len() - 1]
    } else {
        fragment
    }
}

/// Unwrap a tag literal as it appears in Go source into its content.
pub fn unwrap_literal(literal: &str) -> Result<(String, LiteralStyle), SyntaxError> {
    if literal.starts_with('"') {
        let content = quote::unquote(literal).ok_or(SyntaxError::Value)?;
        return Ok((content, LiteralStyle::Interpreted));
    }
    let content = literal
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(literal);
    Ok((content.to_string(), LiteralStyle::Raw))
}

/// Wrap tag content back into a Go literal of the requested style.
///
/// Content holding a backtick cannot be a raw literal and falls back to an
/// interpreted one.
pub fn wrap_literal(content: &str, style: LiteralStyle) -> String {
    match style {
        LiteralStyle::Raw if !content.contains('`') => format!("`{content}`"),
        _ => quote::quote(content),
    }
}
