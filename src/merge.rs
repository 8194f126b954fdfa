//! Tag merge engine.
//!
//! For every selected declaration named in the update specification, each
//! field with a pending fragment gets that fragment folded into its existing
//! tag. A field's tag token is only rewritten when the merged entries differ
//! from the ones already there, which keeps repeated runs from touching files.

use crate::annotation::{self, AnnotationSet, LiteralStyle, SyntaxError};
use crate::config::UpdateSpec;
use crate::error::{Result, TagError};
use crate::locate::{self, TargetSelector};
use crate::model::{line_col, Field, SourceFile};
use tracing::{debug, warn};

/// Merge `fragment` into an existing tag literal (`None` when the field has
/// no tag). Returns the new literal, or `None` if nothing changes.
pub fn merge_tag(existing: Option<&str>, fragment: &str) -> Result<Option<String>, SyntaxError> {
    let (content, style) = match existing {
        Some(literal) => annotation::unwrap_literal(literal)?,
        None => (String::new(), LiteralStyle::Raw),
    };
    let current = AnnotationSet::parse(&content)?;
    let update = AnnotationSet::parse(annotation::strip_backticks(fragment))?;

    let mut merged = current.clone();
    merged.merge(&update);
    if merged == current {
        return Ok(None);
    }
    Ok(Some(annotation::wrap_literal(&merged.serialize(), style)))
}

/// Why no field of a declaration receives the update for `name`, if none does.
/// Fields declared together (`A, B int`) are matched by their first name only.
fn unmatched_field(fields: &[Field], name: &str) -> Option<&'static str> {
    if fields.iter().any(|f| f.name() == name) {
        None
    } else if fields.iter().any(|f| f.names.iter().any(|n| n == name)) {
        Some("field shares a declaration and only its first name is matched")
    } else {
        Some("no such field")
    }
}

/// Merge the update specification into one file. Returns whether the file
/// was modified.
pub fn merge_file(file: &mut SourceFile, spec: &UpdateSpec, selector: &TargetSelector) -> Result<bool> {
    let targets = locate::find(file, |name| selector.matches(name, spec));

    for (type_name, index) in targets {
        let Some(updates) = spec.fields(&type_name) else {
            continue;
        };
        let path = file.path().to_path_buf();
        let (line, _) = line_col(file.text(), file.declarations[index].span.start);
        debug!(path = %path.display(), line, type_name, "matched declaration");

        let mut changed = false;
        let decl = &mut file.declarations[index];

        for field_name in updates.keys() {
            if let Some(reason) = unmatched_field(&decl.fields, field_name) {
                warn!(path = %path.display(), type_name, field = %field_name, "{reason}");
            }
        }

        for field in &mut decl.fields {
            let Some(fragment) = updates.get(field.name()) else {
                continue;
            };
            let malformed = |reason, tag: &str| TagError::MalformedAnnotation {
                path: path.clone(),
                type_name: type_name.clone(),
                field: field.name().to_string(),
                tag: tag.to_string(),
                reason,
            };

            // Check the fragment on its own first so a bad fragment is
            // reported as such even when the existing tag is also broken.
            AnnotationSet::parse(annotation::strip_backticks(fragment))
                .map_err(|reason| malformed(reason, fragment.as_str()))?;
            let merged = merge_tag(field.tag.as_deref(), fragment)
                .map_err(|reason| malformed(reason, field.tag.as_deref().unwrap_or_default()))?;

            if let Some(literal) = merged {
                debug!(
                    type_name,
                    field = field.name(),
                    embedded = field.embedded,
                    tag = %literal,
                    "updated tag"
                );
                changed |= field.set_tag(literal);
            }
        }

        if changed {
            file.mark_dirty();
        }
    }

    Ok(file.is_dirty())
}
