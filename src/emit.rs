//! Rewrite decision and emission.
//!
//! A dirty file is regenerated by splicing each changed tag literal into the
//! original text; clean files are never written.

use crate::error::{Result, TagError};
use crate::model::{SourceFile, TagAnchor};
use std::fs;
use tracing::info;

/// Render the file's current text: the original with every changed tag
/// spliced in.
pub fn render(file: &SourceFile) -> String {
    let mut edits: Vec<(usize, usize, String)> = file
        .declarations
        .iter()
        .flat_map(|decl| decl.fields.iter())
        .filter(|field| field.is_changed())
        .filter_map(|field| {
            let tag = field.tag.as_deref()?;
            Some(match field.anchor {
                TagAnchor::Replace(span) => (span.start, span.end, tag.to_string()),
                TagAnchor::Insert(at) => (at, at, format!(" {tag}")),
            })
        })
        .collect();
    edits.sort_by_key(|(start, _, _)| *start);

    let text = file.text();
    let mut out = String::with_capacity(text.len() + edits.len() * 16);
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        out.push_str(&text[cursor..start]);
        out.push_str(&replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Write a dirty file back to its path. Clean files are left alone.
/// Returns whether the file was written.
pub fn emit(file: &SourceFile) -> Result<bool> {
    if !file.is_dirty() {
        return Ok(false);
    }
    fs::write(file.path(), render(file)).map_err(|source| TagError::Write {
        path: file.path().to_path_buf(),
        source,
    })?;
    info!(path = %file.path().display(), "rewrote file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::path::Path;
    use tempfile::TempDir;

    const SRC: &str = "package p\n\n// Widget is a thing.\ntype Widget struct {\n\tName string `json:\"id\"` // the name\n\tSize int    // bytes\n}\n";

    fn parsed(path: &Path) -> SourceFile {
        parser::parse_file(path, SRC.to_string()).unwrap()
    }

    #[test]
    fn render_unchanged_is_identical() {
        let file = parsed(Path::new("w.go"));
        assert_eq!(render(&file), SRC);
    }

    #[test]
    fn render_replaces_and_inserts() {
        let mut file = parsed(Path::new("w.go"));
        let fields = &mut file.declarations[0].fields;
        fields[0].set_tag("`json:\"name\"`".to_string());
        fields[1].set_tag("`json:\"size\"`".to_string());

        assert_eq!(
            render(&file),
            "package p\n\n// Widget is a thing.\ntype Widget struct {\n\tName string `json:\"name\"` // the name\n\tSize int `json:\"size\"`    // bytes\n}\n"
        );
    }

    #[test]
    fn emit_skips_clean_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("w.go");
        let file = parsed(&path);

        assert!(!emit(&file).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn emit_writes_dirty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("w.go");
        fs::write(&path, SRC).unwrap();
        let mut file = parsed(&path);
        file.declarations[0].fields[0].set_tag("`json:\"name\"`".to_string());
        file.mark_dirty();

        assert!(emit(&file).unwrap());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Name string `json:\"name\"` // the name"));
    }

    #[test]
    fn emit_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("w.go");
        let mut file = parsed(&path);
        file.mark_dirty();

        let err = emit(&file).unwrap_err();
        assert!(matches!(err, TagError::Write { .. }));
    }
}
