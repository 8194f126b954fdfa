//! Update specification: which tags to merge into which fields.
//!
//! Loaded from one or more JSON, YAML or TOML documents shaped as
//! `{ TypeName: { FieldName: "key:\"value\" ..." } }`. Documents are
//! deep-merged in the order given, so later files override earlier ones.

use crate::error::{Result, TagError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Field name → tag fragment.
pub type FieldTags = BTreeMap<String, String>;

/// Type name → field name → tag fragment. Immutable for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct UpdateSpec {
    types: BTreeMap<String, FieldTags>,
}

/// Document formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }

    fn decode(self, text: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

impl UpdateSpec {
    /// Load and merge tags documents in order.
    pub fn load(files: &[PathBuf]) -> Result<Self> {
        if files.is_empty() {
            return Err(TagError::Config("no tags files specified".to_string()));
        }

        let mut merged = Value::Object(Default::default());
        for path in files {
            let document = read_document(path)?;
            debug!(path = %path.display(), "loaded tags document");
            merge_values(&mut merged, document);
        }
        Self::from_value(merged)
    }

    /// Build from an already merged document.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            TagError::Config(format!(
                "tags must map type names to field names to tag strings: {e}"
            ))
        })
    }

    pub fn fields(&self, type_name: &str) -> Option<&FieldTags> {
        self.types.get(type_name)
    }

    pub fn contains_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Read one document, picking the decoder by extension. Unknown extensions
/// are tried as JSON, then YAML, then TOML.
fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| TagError::Config(format!("failed to read {}: {e}", path.display())))?;

    let decoded = match Format::from_path(path) {
        Some(format) => format.decode(&text),
        None => [Format::Json, Format::Yaml, Format::Toml]
            .into_iter()
            .find_map(|format| format.decode(&text).ok())
            .ok_or_else(|| "not a JSON, YAML or TOML document".to_string()),
    };

    match decoded {
        // `~` or an empty YAML document.
        Ok(Value::Null) => Ok(Value::Object(Default::default())),
        Ok(value) => Ok(value),
        Err(e) => Err(TagError::Config(format!(
            "failed to parse {}: {e}",
            path.display()
        ))),
    }
}

/// Deep-merge `overlay` into `base`. Maps merge key by key; any other value
/// in `overlay` replaces the one in `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_files_is_config_error() {
        let err = UpdateSpec::load(&[]).unwrap_err();
        assert_eq!(err.to_string(), "no tags files specified");
    }

    #[test]
    fn loads_each_format() {
        let dir = TempDir::new().unwrap();
        let json = write(&dir, "a.json", r#"{"Widget": {"Name": "json:\"name\""}}"#);
        let yaml = write(&dir, "b.yaml", "Widget:\n  Size: 'json:\"size\"'\n");
        let toml = write(&dir, "c.toml", "[Gadget]\nID = 'db:\"id\"'\n");

        let spec = UpdateSpec::load(&[json, yaml, toml]).unwrap();
        let widget = spec.fields("Widget").unwrap();
        assert_eq!(widget.get("Name").map(String::as_str), Some(r#"json:"name""#));
        assert_eq!(widget.get("Size").map(String::as_str), Some(r#"json:"size""#));
        assert_eq!(
            spec.fields("Gadget").and_then(|f| f.get("ID")).map(String::as_str),
            Some(r#"db:"id""#)
        );
    }

    #[test]
    fn later_files_override_earlier() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "first.json", r#"{"W": {"A": "json:\"a\"", "B": "json:\"b\""}}"#);
        let second = write(&dir, "second.json", r#"{"W": {"A": "json:\"override\""}}"#);

        let spec = UpdateSpec::load(&[first, second]).unwrap();
        let w = spec.fields("W").unwrap();
        assert_eq!(w["A"], r#"json:"override""#);
        assert_eq!(w["B"], r#"json:"b""#);
    }

    #[test]
    fn unknown_extension_is_sniffed() {
        let mut file = Builder::new().suffix(".tags").tempfile().unwrap();
        file.write_all(b"W:\n  A: 'xml:\"a\"'\n").unwrap();

        let spec = UpdateSpec::load(&[file.path().to_path_buf()]).unwrap();
        assert_eq!(spec.fields("W").unwrap()["A"], r#"xml:"a""#);
    }

    #[test]
    fn null_yaml_document_is_empty_spec() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "empty.yaml", "# nothing yet\n~\n");
        let spec = UpdateSpec::load(&[empty]).unwrap();
        assert!(spec.is_empty());
    }

    #[test]
    fn wrong_shape_is_config_error() {
        let err = UpdateSpec::from_value(json!({"W": {"A": 3}})).unwrap_err();
        assert!(matches!(err, TagError::Config(_)));
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = UpdateSpec::load(&[PathBuf::from("/nonexistent/tags.json")]).unwrap_err();
        assert!(err.to_string().starts_with("failed to read /nonexistent/tags.json"));
    }

    #[test]
    fn invalid_document_is_config_error() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.json", "{not json");
        let err = UpdateSpec::load(&[bad]).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[test]
    fn merge_values_replaces_scalars_and_merges_maps() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "b": 1});
        merge_values(&mut base, json!({"a": {"y": 3, "z": 4}, "b": {"nested": true}}));
        assert_eq!(base, json!({"a": {"x": 1, "y": 3, "z": 4}, "b": {"nested": true}}));
    }
}
