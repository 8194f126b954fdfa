//! Source model: a scanned Go file and the struct declarations inside it.
//!
//! The file owns its original text; declarations own their fields; each field
//! owns its tag token. Edits are recorded on the fields and spliced into the
//! original text at emission time, so everything outside a changed tag stays
//! byte-for-byte intact.

use std::path::{Path, PathBuf};

/// Byte range into a file's original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Where a field's tag lives, or would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAnchor {
    /// Existing tag literal occupying this span.
    Replace(Span),
    /// No tag yet; a new one is inserted at this offset (end of the field type).
    Insert(usize),
}

/// A struct field declaration.
#[derive(Debug, Clone)]
pub struct Field {
    /// Declared names. For embedded fields, the embedded type's name.
    pub names: Vec<String>,
    pub embedded: bool,
    /// Current tag literal, delimiters included.
    pub tag: Option<String>,
    pub anchor: TagAnchor,
    changed: bool,
}

impl Field {
    pub fn new(names: Vec<String>, embedded: bool, tag: Option<String>, anchor: TagAnchor) -> Self {
        Self {
            names,
            embedded,
            tag,
            anchor,
            changed: false,
        }
    }

    /// The name used for matching: the first declared name.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Replace the tag literal. Returns false if it was already identical.
    pub fn set_tag(&mut self, literal: String) -> bool {
        if self.tag.as_deref() == Some(literal.as_str()) {
            return false;
        }
        self.tag = Some(literal);
        self.changed = true;
        true
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

/// A named struct type declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub span: Span,
    pub fields: Vec<Field>,
}

/// A scanned Go source file.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    /// Struct declarations in source order.
    pub declarations: Vec<Declaration>,
    dirty: bool,
}

impl SourceFile {
    pub fn new(path: PathBuf, text: String, declarations: Vec<Declaration>) -> Self {
        Self {
            path,
            text,
            declarations,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original text as read from disk.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// 1-based line and column of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}
