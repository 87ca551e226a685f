//! Attribute values carried by events and registration properties.
//!
//! The bus treats attribute data as opaque; this enum only exists so that
//! callers can attach typed payloads and so that registration properties
//! (topic filter, ranking) can be discriminated without stringly-typed
//! parsing.

use serde::{Deserialize, Serialize};

/// Possible values an event attribute or registration property can hold.
///
/// # Examples
///
/// ```
/// use topicbus::Value;
///
/// let flag = Value::Bool(true);
/// let count = Value::from(42i64);
/// let name = Value::from("resource-7");
///
/// assert!(flag.is_bool());
/// assert_eq!(count.as_int(), Some(42));
/// assert_eq!(name.as_str(), Some("resource-7"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Single string.
    String(String),
    /// Sequence of strings (used for multi-pattern topic filters).
    Strings(Vec<String>),
    /// Arbitrary structured JSON data.
    Structured(serde_json::Value),
    /// Absent value.
    Null,
}

impl Value {
    /// Returns `true` if this is a [`Value::Bool`].
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns `true` if this is a [`Value::Int`].
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns `true` if this is a [`Value::String`].
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns `true` if this is a [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The contained boolean, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The contained integer, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The contained float, if any.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The contained string slice, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The contained string sequence, if any.
    #[must_use]
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Strings(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::Strings(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_str(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert!(Value::Null.is_null());
        assert_eq!(
            Value::from(vec!["a".to_string(), "b".to_string()]).as_strings(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
    }

    #[test]
    fn serde_round_trip_is_tagged() {
        let v = Value::String("org/example/added".to_string());
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "string");
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }
}
