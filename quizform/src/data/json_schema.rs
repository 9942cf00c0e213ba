use serde_json::{Map, Value};

use crate::data::{
    item::InputKind,
    schema::{
        ChoiceField, FieldBase, FieldSchema, GroupField, PrimitiveField, ROOT_PATH, SchemaError,
        SchemaRoot,
    },
};

// `$ref` chains longer than this are treated as cycles.
const MAX_REF_DEPTH: usize = 32;

impl SchemaRoot {
    /// Convert a JSON Schema document into form fields.
    ///
    /// The document is usually produced by `schemars::schema_for!`. Object
    /// properties become groups, string enums become choices, and scalar
    /// types become primitive inputs. Properties that cannot be edited as a
    /// single field (arrays, maps) are skipped.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let resolver = Resolver { root: schema };
        let node = resolver.resolve(schema)?;
        let title = node.get("title").and_then(Value::as_str).map(str::to_string);
        let fields = resolver.object_fields(node, ROOT_PATH)?;
        SchemaRoot::new(title, fields)
    }
}

struct Resolver<'a> {
    root: &'a Value,
}

impl<'a> Resolver<'a> {
    fn lookup(&self, reference: &str) -> Result<&'a Value, SchemaError> {
        if reference == "#" {
            return Ok(self.root);
        }
        let found = ["#/$defs/", "#/definitions/"].iter().find_map(|prefix| {
            let name = reference.strip_prefix(prefix)?;
            let defs = prefix.trim_start_matches("#/").trim_end_matches('/');
            self.root.get(defs)?.get(name)
        });
        found.ok_or_else(|| SchemaError::Unresolved {
            reference: reference.to_string(),
        })
    }

    /// Follow `$ref`s and single-variant wrappers down to a concrete node.
    fn resolve(&self, node: &'a Value) -> Result<&'a Value, SchemaError> {
        let mut node = node;
        for _ in 0..MAX_REF_DEPTH {
            if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
                node = self.lookup(reference)?;
            } else if let Some(inner) = single_variant(node) {
                node = inner;
            } else {
                return Ok(node);
            }
        }
        Err(SchemaError::Unresolved {
            reference: format!("reference chain deeper than {MAX_REF_DEPTH}"),
        })
    }

    fn object_fields(&self, node: &'a Value, path: &str) -> Result<Vec<FieldSchema>, SchemaError> {
        let Some(properties) = node.get("properties").and_then(Value::as_object) else {
            return Err(SchemaError::NotAnObject {
                path: path.to_string(),
            });
        };

        let mut fields = Vec::with_capacity(properties.len());
        for (key, prop) in properties {
            if let Some(field) = self.field(key, prop, path)? {
                fields.push(field);
            }
        }
        Ok(fields)
    }

    fn field(&self, key: &str, prop: &'a Value, path: &str) -> Result<Option<FieldSchema>, SchemaError> {
        let name = label(prop).unwrap_or_else(|| key.to_string());
        let node = self.resolve(prop)?;
        let base = FieldBase {
            id: key.to_string(),
            name,
        };

        if let Some(options) = enum_options(node) {
            return Ok(Some(FieldSchema::Choice(ChoiceField { base, options })));
        }

        let field = match primary_type(node) {
            Some("object") if node.get("properties").is_some() => {
                let path = format!("{path}.{key}");
                let fields = self.object_fields(node, &path)?;
                FieldSchema::Group(GroupField { base, fields })
            }
            Some("integer") | Some("number") => FieldSchema::Primitive(PrimitiveField {
                base,
                kind: InputKind::Number,
            }),
            Some("boolean") => FieldSchema::Primitive(PrimitiveField {
                base,
                kind: InputKind::Checkbox,
            }),
            Some("string") => FieldSchema::Primitive(PrimitiveField {
                base,
                kind: InputKind::Text,
            }),
            other => {
                warn!("skipping `{path}.{key}`: unsupported schema type {other:?}");
                return Ok(None);
            }
        };
        Ok(Some(field))
    }
}

/// `allOf: [x]`, or `anyOf`/`oneOf` with exactly one non-null variant.
fn single_variant(node: &Value) -> Option<&Value> {
    if let Some([only]) = node.get("allOf").and_then(Value::as_array).map(Vec::as_slice) {
        return Some(only);
    }
    for key in ["anyOf", "oneOf"] {
        let Some(variants) = node.get(key).and_then(Value::as_array) else {
            continue;
        };
        let mut non_null = variants.iter().filter(|v| !is_null_type(v));
        if let (Some(only), None) = (non_null.next(), non_null.next()) {
            return Some(only);
        }
    }
    None
}

fn is_null_type(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some("null")
}

/// String values of an `enum`, or of a `oneOf` made of constants.
fn enum_options(node: &Value) -> Option<Vec<String>> {
    if let Some(values) = node.get("enum").and_then(Value::as_array) {
        return values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string))
            .collect();
    }

    let variants = node
        .get("oneOf")
        .or_else(|| node.get("anyOf"))
        .and_then(Value::as_array)?;
    variants
        .iter()
        .filter(|v| !is_null_type(v))
        .map(constant)
        .collect()
}

fn constant(variant: &Value) -> Option<String> {
    if let Some(s) = variant.get("const").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    match variant.get("enum").and_then(Value::as_array).map(Vec::as_slice) {
        Some([Value::String(s)]) => Some(s.clone()),
        _ => None,
    }
}

fn primary_type(node: &Value) -> Option<&str> {
    match node.get("type") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ if node.get("properties").is_some() => Some("object"),
        _ => None,
    }
}

fn label(node: &Value) -> Option<String> {
    let obj: &Map<String, Value> = node.as_object()?;
    if let Some(title) = obj.get("title").and_then(Value::as_str) {
        return Some(title.to_string());
    }
    obj.get("description")
        .and_then(Value::as_str)
        .and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(|l| l.trim_end_matches('.').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    /// Quiz client settings.
    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Settings {
        /// Backend base URL.
        server: String,
        /// Retry count.
        retries: u32,
        verbose: bool,
        /// Output level.
        level: Level,
        profile: Profile,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    enum Level {
        Quiet,
        Loud,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Profile {
        /// Grade level.
        grade: u8,
        /// Exam to prepare for.
        exam: Exam,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    enum Exam {
        /// Massachusetts.
        Mcas,
        /// California.
        Cst,
    }

    fn schema_of<T: JsonSchema>() -> Value {
        serde_json::to_value(schemars::schema_for!(T)).unwrap()
    }

    #[test]
    fn test_derived_schema_to_fields() {
        let root = SchemaRoot::from_json_schema(&schema_of::<Settings>()).unwrap();
        assert_eq!(root.title.as_deref(), Some("Settings"));

        let ids: Vec<_> = root.fields.iter().map(FieldSchema::id).collect();
        // `tags` is skipped
        assert_eq!(
            ids,
            ["server", "retries", "verbose", "level", "profile", "nickname"]
        );

        match root.get("server").unwrap() {
            FieldSchema::Primitive(p) => {
                assert_eq!(p.kind, InputKind::Text);
                assert_eq!(p.base.name, "Backend base URL");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            root.get("retries"),
            Some(FieldSchema::Primitive(PrimitiveField { kind: InputKind::Number, .. }))
        ));
        assert!(matches!(
            root.get("verbose"),
            Some(FieldSchema::Primitive(PrimitiveField { kind: InputKind::Checkbox, .. }))
        ));
        assert!(matches!(
            root.get("nickname"),
            Some(FieldSchema::Primitive(PrimitiveField { kind: InputKind::Text, .. }))
        ));

        match root.get("level").unwrap() {
            FieldSchema::Choice(c) => {
                assert_eq!(c.options, ["Quiet", "Loud"]);
                assert_eq!(c.base.name, "Output level");
            }
            other => panic!("unexpected {other:?}"),
        }

        let FieldSchema::Group(profile) = root.get("profile").unwrap() else {
            panic!("profile should be a group");
        };
        assert_eq!(profile.fields.len(), 2);
        match &profile.fields[1] {
            FieldSchema::Choice(c) => assert_eq!(c.options, ["Mcas", "Cst"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_legacy_definitions_and_all_of() {
        let schema = json!({
            "title": "Legacy",
            "type": "object",
            "properties": {
                "mode": {
                    "description": "Run mode.\n\nMore text.",
                    "allOf": [{"$ref": "#/definitions/Mode"}]
                }
            },
            "definitions": {
                "Mode": {"type": "string", "enum": ["fast", "slow"]}
            }
        });
        let root = SchemaRoot::from_json_schema(&schema).unwrap();
        match &root.fields[0] {
            FieldSchema::Choice(c) => {
                assert_eq!(c.base.name, "Run mode");
                assert_eq!(c.options, ["fast", "slow"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let schema = json!({
            "type": "object",
            "properties": {"x": {"$ref": "#/$defs/Missing"}}
        });
        assert!(matches!(
            SchemaRoot::from_json_schema(&schema),
            Err(SchemaError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_root_must_have_properties() {
        assert!(matches!(
            SchemaRoot::from_json_schema(&json!({"type": "string"})),
            Err(SchemaError::NotAnObject { .. })
        ));
    }
}
