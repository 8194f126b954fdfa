//! Error kinds. Every one of them aborts the run.

use crate::annotation::SyntaxError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagError {
    /// No tags files, unreadable or undecodable tags documents, bad options.
    #[error("{0}")]
    Config(String),

    /// A source file could not be read or scanned.
    #[error("{location}: {message}")]
    Parse { location: String, message: String },

    /// An existing tag or an update fragment is not `key:"value"` syntax.
    #[error("{}: {type_name}.{field}: malformed struct tag {tag}: {reason}", path.display())]
    MalformedAnnotation {
        path: PathBuf,
        type_name: String,
        field: String,
        tag: String,
        reason: SyntaxError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = TagError> = std::result::Result<T, E>;
