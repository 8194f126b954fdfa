//! Source parsing, dispatched by file extension.

pub mod go;
pub mod lexer;

use crate::error::{Result, TagError};
use crate::model::{line_col, SourceFile};
use std::path::Path;

/// Parse a source file into a [`SourceFile`] based on its extension.
pub fn parse_file(path: &Path, content: String) -> Result<SourceFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("go") => {
            let declarations = go::parse(&content).map_err(|err| {
                let (line, column) = line_col(&content, err.offset);
                TagError::Parse {
                    location: format!("{}:{line}:{column}", path.display()),
                    message: err.message,
                }
            })?;
            Ok(SourceFile::new(path.to_path_buf(), content, declarations))
        }
        _ => Err(TagError::Parse {
            location: path.display().to_string(),
            message: "unsupported file type".to_string(),
        }),
    }
}
