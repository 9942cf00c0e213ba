use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::data::item::InputKind;

/// Errors produced while loading or converting field schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two siblings share the same id.
    #[error("duplicate field id `{id}` in `{path}`")]
    DuplicateId { path: String, id: String },
    /// A field has no id.
    #[error("field without id in `{path}`")]
    MissingId { path: String },
    /// A node that must be an object (or a field list) is something else.
    #[error("`{path}` is not an object")]
    NotAnObject { path: String },
    /// A `$ref` that does not point into the document's definitions.
    #[error("unresolved schema reference: {reference}")]
    Unresolved { reference: String },
    /// Schema file with an extension other than json/toml.
    #[error("unsupported schema file extension: {ext:?}")]
    UnsupportedFormat { ext: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Declarative field description, as written in schema files.
///
/// Every attribute is optional here; [`FieldSchema::from_raw`] decides which
/// variant the field becomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    /// Key into the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Primitive input kind, "text" when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Closed set of choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Nested fields of a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<RawField>>,
}

/// Metadata shared by every field variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBase {
    /// Key into the enclosing model.
    pub id: String,
    /// Display label.
    pub name: String,
}

/// A group of nested fields, stored as a nested model.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupField {
    pub base: FieldBase,
    pub fields: Vec<FieldSchema>,
}

/// A field restricted to a fixed, ordered set of string values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceField {
    pub base: FieldBase,
    pub options: Vec<String>,
}

/// A single scalar input.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveField {
    pub base: FieldBase,
    pub kind: InputKind,
}

/// One form field, classified once when the schema is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSchema {
    Group(GroupField),
    Choice(ChoiceField),
    Primitive(PrimitiveField),
}

impl FieldSchema {
    /// Classify a raw field.
    ///
    /// A non-empty `schema` makes a group, whatever else is set. Otherwise a
    /// present `options` list makes a choice. Everything else is a primitive
    /// of kind `type`, or text.
    pub fn from_raw(raw: RawField, parent: &str) -> Result<Self, SchemaError> {
        let id = raw.id.ok_or_else(|| SchemaError::MissingId {
            path: parent.to_string(),
        })?;
        let base = FieldBase {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
        };

        if let Some(schema) = raw.schema.filter(|s| !s.is_empty()) {
            let path = format!("{parent}.{}", base.id);
            let fields = build_fields(schema, &path)?;
            return Ok(FieldSchema::Group(GroupField { base, fields }));
        }

        if let Some(options) = raw.options {
            return Ok(FieldSchema::Choice(ChoiceField { base, options }));
        }

        let kind = raw.kind.as_deref().map(InputKind::from).unwrap_or_default();
        Ok(FieldSchema::Primitive(PrimitiveField { base, kind }))
    }

    /// Parse a single field from its JSON description.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let raw: RawField = serde_json::from_value(value.clone())?;
        Self::from_raw(raw, ROOT_PATH)
    }

    /// Shared field metadata.
    pub fn base(&self) -> &FieldBase {
        match self {
            FieldSchema::Group(g) => &g.base,
            FieldSchema::Choice(c) => &c.base,
            FieldSchema::Primitive(p) => &p.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }
}

pub(crate) const ROOT_PATH: &str = "$";

/// Classify a sibling list, rejecting repeated ids.
pub(crate) fn build_fields(raws: Vec<RawField>, path: &str) -> Result<Vec<FieldSchema>, SchemaError> {
    let fields = raws
        .into_iter()
        .map(|raw| FieldSchema::from_raw(raw, path))
        .collect::<Result<Vec<_>, _>>()?;
    check_unique(&fields, path)?;
    Ok(fields)
}

pub(crate) fn check_unique(fields: &[FieldSchema], path: &str) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id()) {
            return Err(SchemaError::DuplicateId {
                path: path.to_string(),
                id: field.id().to_string(),
            });
        }
    }
    Ok(())
}

/// Top-level field list of a form.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRoot {
    /// Optional form title.
    pub title: Option<String>,
    /// Top-level fields in display order.
    pub fields: Vec<FieldSchema>,
}

/// Object form of a schema document: `{"title": ..., "schema": [...]}`.
#[derive(Deserialize)]
struct RawRoot {
    #[serde(default, alias = "name")]
    title: Option<String>,
    schema: Vec<RawField>,
}

impl SchemaRoot {
    /// Build a root from already classified fields.
    pub fn new(title: Option<String>, fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        check_unique(&fields, ROOT_PATH)?;
        Ok(Self { title, fields })
    }

    /// Parse a schema document.
    ///
    /// Accepts either a bare array of fields or an object with a `schema`
    /// array and an optional `title`.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let raw = match value {
            Value::Array(_) => RawRoot {
                title: None,
                schema: serde_json::from_value(value.clone())?,
            },
            Value::Object(_) => serde_json::from_value(value.clone())?,
            _ => {
                return Err(SchemaError::NotAnObject {
                    path: ROOT_PATH.to_string(),
                });
            }
        };
        let fields = build_fields(raw.schema, ROOT_PATH)?;
        Ok(Self {
            title: raw.title,
            fields,
        })
    }

    /// Parse schema content according to a file extension (`json` or `toml`).
    pub fn from_str_with_ext(content: &str, ext: &str) -> Result<Self, SchemaError> {
        let value: Value = match ext {
            "json" => serde_json::from_str(content)?,
            "toml" => {
                let v: toml::Value = toml::from_str(content)?;
                serde_json::to_value(v)?
            }
            _ => {
                return Err(SchemaError::UnsupportedFormat {
                    ext: ext.to_string(),
                });
            }
        };
        Self::from_json(&value)
    }

    /// Load a schema file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let content = fs::read_to_string(path)?;
        Self::from_str_with_ext(&content, ext)
    }

    /// Find a top-level field by id.
    pub fn get(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_wins_over_options() {
        let field = FieldSchema::from_json(&json!({
            "id": "prefs",
            "name": "Preferences",
            "options": ["a", "b"],
            "type": "number",
            "schema": [{"id": "grade", "type": "number"}]
        }))
        .unwrap();

        let FieldSchema::Group(group) = field else {
            panic!("expected a group");
        };
        assert_eq!(group.base.name, "Preferences");
        assert_eq!(group.fields.len(), 1);
    }

    #[test]
    fn test_choice_keeps_option_order() {
        let field = FieldSchema::from_json(&json!({
            "id": "state",
            "name": "State",
            "type": "number",
            "options": ["Alaska", "California", "Colorado"]
        }))
        .unwrap();

        match field {
            FieldSchema::Choice(c) => {
                assert_eq!(c.options, vec!["Alaska", "California", "Colorado"])
            }
            other => panic!("expected a choice, got {other:?}"),
        }
    }

    #[test]
    fn test_primitive_kind_defaults_to_text() {
        let field = FieldSchema::from_json(&json!({"id": "name", "name": "Name"})).unwrap();
        match field {
            FieldSchema::Primitive(p) => assert_eq!(p.kind, InputKind::Text),
            other => panic!("expected a primitive, got {other:?}"),
        }

        let field = FieldSchema::from_json(&json!({"id": "phone", "type": "tel"})).unwrap();
        match field {
            FieldSchema::Primitive(p) => {
                assert_eq!(p.kind, InputKind::Telephone);
                assert_eq!(p.base.name, "phone");
            }
            other => panic!("expected a primitive, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_nested_schema_is_not_a_group() {
        let field = FieldSchema::from_json(&json!({
            "id": "x",
            "schema": [],
            "options": []
        }))
        .unwrap();
        assert!(matches!(field, FieldSchema::Choice(ref c) if c.options.is_empty()));

        let field = FieldSchema::from_json(&json!({"id": "y", "schema": []})).unwrap();
        assert!(matches!(field, FieldSchema::Primitive(_)));
    }

    #[test]
    fn test_duplicate_sibling_ids_rejected() {
        let err = SchemaRoot::from_json(&json!([
            {"id": "name"},
            {"id": "name"}
        ]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId { ref id, .. } if id == "name"));

        let err = SchemaRoot::from_json(&json!([
            {"id": "prefs", "schema": [{"id": "a"}, {"id": "a"}]}
        ]))
        .unwrap_err();
        match err {
            SchemaError::DuplicateId { path, .. } => assert_eq!(path, "$.prefs"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_groups_have_own_namespace() {
        let root = SchemaRoot::from_json(&json!([
            {"id": "id"},
            {"id": "prefs", "schema": [{"id": "id"}]}
        ]))
        .unwrap();
        assert_eq!(root.fields.len(), 2);
        assert!(root.get("prefs").is_some());
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = SchemaRoot::from_json(&json!([{"name": "Nameless"}])).unwrap_err();
        assert!(matches!(err, SchemaError::MissingId { .. }));
    }

    #[test]
    fn test_root_object_form_and_toml() {
        let root = SchemaRoot::from_json(&json!({
            "title": "Profile",
            "schema": [{"id": "name", "name": "Name"}]
        }))
        .unwrap();
        assert_eq!(root.title.as_deref(), Some("Profile"));

        let toml = r#"
title = "Profile"

[[schema]]
id = "name"
name = "Name"

[[schema]]
id = "state"
options = ["Alaska", "California"]
"#;
        let root = SchemaRoot::from_str_with_ext(toml, "toml").unwrap();
        assert_eq!(root.fields.len(), 2);
        assert!(matches!(root.fields[1], FieldSchema::Choice(_)));

        assert!(matches!(
            SchemaRoot::from_str_with_ext("", "yaml"),
            Err(SchemaError::UnsupportedFormat { .. })
        ));
    }
}
