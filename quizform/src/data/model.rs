use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::schema::SchemaError;

/// Live key-value data edited by a form.
///
/// Values are strings, numbers or nested models for group fields. Key order
/// follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(Map<String, Value>);

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level value stored under `id`.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    /// Set a top-level value, returning the previous one.
    pub fn insert(&mut self, id: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(id.into(), value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The model as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Model {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Model {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(SchemaError::NotAnObject {
                path: "model".to_string(),
            }),
        }
    }
}

/// Path from the model root to one value.
///
/// A slot is the capability a renderer holds instead of a reference into the
/// model: it can read or write exactly the value it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Slot(Vec<String>);

impl Slot {
    /// The slot naming the whole model.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a slot from a list of ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Parse a dot-separated path such as `prefs.grade`.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self::from_ids(path.split('.'))
    }

    /// Slot of a field nested directly under this one.
    pub fn child(&self, id: &str) -> Self {
        let mut ids = self.0.clone();
        ids.push(id.to_string());
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is `other` or nested below it.
    pub fn starts_with(&self, other: &Slot) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Read the value at this slot. Missing entries read as absent.
    pub fn read<'a>(&self, model: &'a Model) -> Option<&'a Value> {
        let (first, rest) = self.0.split_first()?;
        let mut value = model.0.get(first)?;
        for id in rest {
            value = value.as_object()?.get(id)?;
        }
        Some(value)
    }

    /// Write a value at this slot.
    ///
    /// Missing intermediate groups are created; an intermediate entry that is
    /// not an object is replaced by an empty group. Writing the root slot
    /// replaces the model when `value` is an object.
    pub fn write(&self, model: &mut Model, value: Value) {
        let Some((last, parents)) = self.0.split_last() else {
            if let Value::Object(map) = value {
                model.0 = map;
            }
            return;
        };

        let mut map = &mut model.0;
        for id in parents {
            map = ensure_object(map.entry(id.clone()).or_insert(Value::Null));
        }
        map.insert(last.clone(), value);
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        unreachable!("value was just replaced by an object");
    };
    map
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}
