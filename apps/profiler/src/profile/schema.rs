//! Schema Loader — resolves the JSON template that shapes a generated profile.

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::errors::AppError;

/// Built-in HR profile template.
pub const DEFAULT_SCHEMA_JSON: &str = include_str!("../../schemas/core.json");

/// A JSON object whose keys (and value types) define the expected shape of a profile.
/// Always a non-empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTemplate(Map<String, Value>);

impl SchemaTemplate {
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(fields) if fields.is_empty() => Err(AppError::SchemaLoad(
                "Schema JSON must declare at least one field.".to_string(),
            )),
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::SchemaLoad(format!(
                "Schema JSON must be an object at the top level, found {}.",
                json_type_name(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.0.len()
    }
}

/// Pretty-printed JSON, as embedded in the model instruction.
impl fmt::Display for SchemaTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// Where a template comes from.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    Default,
    Path(PathBuf),
    Inline(Value),
}

impl SchemaSource {
    pub fn load(self) -> Result<SchemaTemplate, AppError> {
        match self {
            SchemaSource::Default => {
                let value = serde_json::from_str(DEFAULT_SCHEMA_JSON).map_err(|e| {
                    AppError::SchemaLoad(format!("Built-in schema contains invalid JSON: {e}"))
                })?;
                SchemaTemplate::from_value(value)
            }
            SchemaSource::Path(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        AppError::SchemaLoad(format!("Schema file not found: {}", path.display()))
                    } else {
                        AppError::SchemaLoad(format!(
                            "Schema file could not be read: {}: {e}",
                            path.display()
                        ))
                    }
                })?;
                let value = serde_json::from_str(raw.trim()).map_err(|e| {
                    AppError::SchemaLoad(format!(
                        "Schema file does not contain valid JSON: {}: {e}",
                        path.display()
                    ))
                })?;
                SchemaTemplate::from_value(value)
            }
            SchemaSource::Inline(value) => SchemaTemplate::from_value(value),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::io::Write;

    #[test]
    fn test_default_schema_has_expected_keys() {
        let template = SchemaSource::Default.load().unwrap();
        let keys: BTreeSet<&str> = template.keys().collect();
        let expected: BTreeSet<&str> = [
            "jobTitle",
            "jobCode",
            "descriptionCaption",
            "description",
            "justificationJobDescription",
            "requirement",
            "aboutCompany",
            "experience",
            "salary",
            "skills",
            "benefits",
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "", "skills": []}}"#).unwrap();

        let template = SchemaSource::Path(file.path().to_path_buf()).load().unwrap();
        assert_eq!(template.field_count(), 2);
        assert_eq!(template.fields()["skills"], json!([]));
    }

    #[test]
    fn test_missing_file_is_schema_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaSource::Path(dir.path().join("absent.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, AppError::SchemaLoad(ref m) if m.contains("not found")));
    }

    #[test]
    fn test_invalid_json_file_is_schema_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = SchemaSource::Path(file.path().to_path_buf()).load().unwrap_err();
        assert!(matches!(err, AppError::SchemaLoad(ref m) if m.contains("valid JSON")));
    }

    #[test]
    fn test_non_object_schema_is_rejected() {
        let err = SchemaSource::Inline(json!(["jobTitle"])).load().unwrap_err();
        assert!(matches!(err, AppError::SchemaLoad(ref m) if m.contains("found array")));
    }

    #[test]
    fn test_empty_object_schema_is_rejected() {
        let err = SchemaSource::Inline(json!({})).load().unwrap_err();
        assert_eq!(err.kind(), "SchemaLoadError");
    }

    #[test]
    fn test_display_is_pretty_json() {
        let template = SchemaSource::Inline(json!({"jobTitle": ""})).load().unwrap();
        assert_eq!(template.to_string(), "{\n  \"jobTitle\": \"\"\n}");
    }
}
