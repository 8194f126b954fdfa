//! One invocation: load, scan, merge, emit.
//!
//! Every file is merged before any is written, so a malformed tag anywhere
//! aborts the run with the directory untouched.

use crate::config::UpdateSpec;
use crate::emit;
use crate::error::{Result, TagError};
use crate::locate::TargetSelector;
use crate::merge;
use crate::model::SourceFile;
use crate::parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension of scanned sources.
const SOURCE_EXTENSION: &str = "go";

/// Options for [`apply_tags`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dir: PathBuf,
    pub tag_files: Vec<PathBuf>,
    pub selector: TargetSelector,
    pub dry_run: bool,
}

/// What a run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub scanned: usize,
    /// Files rewritten (or, in a dry run, that would be).
    pub rewritten: Vec<PathBuf>,
}

/// All state for a single run.
pub struct Run {
    spec: UpdateSpec,
    selector: TargetSelector,
    files: Vec<SourceFile>,
}

impl Run {
    pub fn new(spec: UpdateSpec, selector: TargetSelector) -> Self {
        Self {
            spec,
            selector,
            files: Vec::new(),
        }
    }

    /// Parse every source file directly inside `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<()> {
        for path in list_sources(dir)? {
            let content = fs::read_to_string(&path).map_err(|e| TagError::Parse {
                location: path.display().to_string(),
                message: format!("failed to read: {e}"),
            })?;
            debug!(path = %path.display(), "scanning");
            self.files.push(parser::parse_file(&path, content)?);
        }
        Ok(())
    }

    /// Merge the update specification into every loaded file.
    pub fn merge(&mut self) -> Result<()> {
        for file in &mut self.files {
            merge::merge_file(file, &self.spec, &self.selector)?;
        }
        Ok(())
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn dirty_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(|f| f.is_dirty())
    }

    /// Write every dirty file. Returns the paths written.
    pub fn emit(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for file in &self.files {
            if emit::emit(file)? {
                written.push(file.path().to_path_buf());
            }
        }
        Ok(written)
    }
}

/// Load tags, scan `opts.dir`, merge, and write changed files.
pub fn apply_tags(opts: &RunOptions) -> Result<Summary> {
    let spec = UpdateSpec::load(&opts.tag_files)?;
    if spec.is_empty() {
        warn!("tags files name no struct types");
    }

    let mut run = Run::new(spec, opts.selector.clone());
    run.load_dir(&opts.dir)?;
    run.merge()?;

    let rewritten = if opts.dry_run {
        run.dirty_files().map(|f| f.path().to_path_buf()).collect()
    } else {
        run.emit()?
    };

    let summary = Summary {
        scanned: run.files().len(),
        rewritten,
    };
    info!(
        scanned = summary.scanned,
        rewritten = summary.rewritten.len(),
        dry_run = opts.dry_run,
        "done"
    );
    Ok(summary)
}

/// Source files directly inside `dir` (non-recursive), sorted.
fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| TagError::Parse {
        location: dir.display().to_string(),
        message: format!("failed to read directory: {e}"),
    })?;

    let entries = entries
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TagError::Parse {
            location: dir.display().to_string(),
            message: format!("failed to read directory entry: {e}"),
        })?;

    let mut files = Vec::new();
    for path in entries.into_iter().map(|entry| entry.path()) {
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            continue;
        }
        let meta = fs::metadata(&path).map_err(|e| TagError::Parse {
            location: path.display().to_string(),
            message: format!("failed to stat: {e}"),
        })?;
        if meta.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WIDGET: &str = "package p\n\ntype Widget struct {\n\tName string `json:\"id\"`\n}\n";
    const OTHER: &str = "package p\n\ntype Other struct {\n\tName   string\n}\n";

    fn setup() -> (TempDir, RunOptions) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("widget.go"), WIDGET).unwrap();
        fs::write(dir.path().join("other.go"), OTHER).unwrap();
        fs::write(dir.path().join("README.md"), "not go").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.go"), "not scanned {").unwrap();
        let tags = dir.path().join("tags.json");
        fs::write(&tags, r#"{"Widget": {"Name": "json:\"name,omitempty\""}}"#).unwrap();

        let opts = RunOptions {
            dir: dir.path().to_path_buf(),
            tag_files: vec![tags],
            selector: TargetSelector::default(),
            dry_run: false,
        };
        (dir, opts)
    }

    #[test]
    fn rewrites_only_changed_files() {
        let (dir, opts) = setup();
        let summary = apply_tags(&opts).unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.rewritten, vec![dir.path().join("widget.go")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("widget.go")).unwrap(),
            "package p\n\ntype Widget struct {\n\tName string `json:\"name,omitempty\"`\n}\n"
        );
        assert_eq!(fs::read_to_string(dir.path().join("other.go")).unwrap(), OTHER);
    }

    #[test]
    fn second_run_rewrites_nothing() {
        let (_dir, opts) = setup();
        apply_tags(&opts).unwrap();
        let summary = apply_tags(&opts).unwrap();
        assert!(summary.rewritten.is_empty());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (dir, mut opts) = setup();
        opts.dry_run = true;
        let summary = apply_tags(&opts).unwrap();

        assert_eq!(summary.rewritten, vec![dir.path().join("widget.go")]);
        assert_eq!(fs::read_to_string(dir.path().join("widget.go")).unwrap(), WIDGET);
    }

    #[test]
    fn malformed_tag_aborts_before_writing() {
        let (dir, opts) = setup();
        fs::write(
            dir.path().join("another.go"),
            "package p\n\ntype Widget struct {\n\tName string `json:broken`\n}\n",
        )
        .unwrap();

        let err = apply_tags(&opts).unwrap_err();
        assert!(matches!(err, TagError::MalformedAnnotation { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("widget.go")).unwrap(), WIDGET);
    }

    #[test]
    fn unparsable_file_aborts() {
        let (dir, opts) = setup();
        fs::write(dir.path().join("broken.go"), "package p\ntype S struct {\n").unwrap();

        let err = apply_tags(&opts).unwrap_err();
        assert!(matches!(err, TagError::Parse { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("widget.go")).unwrap(), WIDGET);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_entry_aborts() {
        let (dir, opts) = setup();
        std::os::unix::fs::symlink(dir.path().join("gone.go"), dir.path().join("dangling.go")).unwrap();

        let err = apply_tags(&opts).unwrap_err();
        assert!(err.to_string().contains("dangling.go"), "{err}");
        assert_eq!(fs::read_to_string(dir.path().join("widget.go")).unwrap(), WIDGET);
    }

    #[test]
    fn missing_directory_is_parse_error() {
        let (dir, mut opts) = setup();
        opts.dir = dir.path().join("nope");
        assert!(matches!(apply_tags(&opts), Err(TagError::Parse { .. })));
    }
}
