// src/value.rs - Observation value representation
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded value of an observation
///
/// Adapters report every value as text. Sample and event values that parse
/// as numbers become [`Value::Numeric`]; everything else, including alarm and
/// condition payloads, is kept verbatim as [`Value::Text`].
///
/// # Examples
///
/// ```rust
/// use quarry::Value;
///
/// assert_eq!(Value::parse("12.5"), Value::Numeric(12.5));
/// assert_eq!(Value::parse("ACTIVE"), Value::Text("ACTIVE".to_string()));
/// assert_eq!(Value::parse(" 7 ").as_float(), Some(7.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Numeric value (64-bit float)
    Numeric(f64),
    /// Textual value, kept exactly as received
    Text(String),
}

/// Value type enumeration for type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Numeric value
    Numeric,
    /// Textual value
    Text,
}

impl Value {
    /// Parse adapter text, falling back to [`Value::Text`] when it is not a number
    ///
    /// Never fails: malformed numeric text is a normal occurrence upstream and
    /// simply stays textual. Non-finite spellings such as `NaN` or `inf` are
    /// text too.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Text(raw.to_string());
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Numeric(f),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Get the numeric value if this is numeric
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Numeric(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    /// Get the text if this is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Numeric(_) => None,
            Value::Text(s) => Some(s),
        }
    }

    /// Convert to string representation
    pub fn as_string(&self) -> String {
        match self {
            Value::Numeric(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Check whether the value was decoded as a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Numeric(_))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Numeric(_) => "numeric",
            Value::Text(_) => "text",
        }
    }

    /// Get the ValueType for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Numeric(_) => ValueType::Numeric,
            Value::Text(_) => ValueType::Text,
        }
    }

    /// Apply a linear map to a numeric value; text passes through untouched
    pub fn map_numeric(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Value::Numeric(v) => Value::Numeric(f(v)),
            text => text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
