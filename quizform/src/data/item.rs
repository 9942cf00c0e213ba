use std::fmt;

use serde_json::{Number, Value};

/// Input widget kind of a primitive field.
///
/// The set is open: unknown kinds are kept verbatim and rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Free text, the default.
    #[default]
    Text,
    /// Numeric input.
    Number,
    /// Telephone number.
    Telephone,
    /// Boolean toggle.
    Checkbox,
    /// Any other kind declared by a schema.
    Other(String),
}

impl From<&str> for InputKind {
    fn from(s: &str) -> Self {
        match s {
            "text" => InputKind::Text,
            "number" => InputKind::Number,
            "tel" | "telephone" => InputKind::Telephone,
            "checkbox" => InputKind::Checkbox,
            other => InputKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InputKind {
    /// Name of the kind as written in schemas.
    pub fn as_str(&self) -> &str {
        match self {
            InputKind::Text => "text",
            InputKind::Number => "number",
            InputKind::Telephone => "tel",
            InputKind::Checkbox => "checkbox",
            InputKind::Other(s) => s,
        }
    }

    /// Convert widget text into the value stored in the model.
    ///
    /// Numbers and checkboxes get a typed value when the text parses as one;
    /// anything else is stored verbatim as a string.
    pub fn parse_input(&self, text: &str) -> Value {
        match self {
            InputKind::Number => {
                let trimmed = text.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Number(Number::from(i))
                } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                    Value::Number(n)
                } else {
                    Value::String(text.to_string())
                }
            }
            InputKind::Checkbox => match text.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text.to_string()),
            },
            _ => Value::String(text.to_string()),
        }
    }
}

/// Text shown in an input widget for a stored value.
///
/// A missing value or `null` shows as empty.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Whether a stored value counts as a checked checkbox.
pub fn is_checked(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}
