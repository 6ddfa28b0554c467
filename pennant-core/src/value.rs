//! Flag values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete variant a flag resolves to.
///
/// # Examples
///
/// ```
/// use pennant_core::FlagValue;
///
/// let theme = FlagValue::string("dark");
/// assert_eq!(theme.as_str(), Some("dark"));
/// assert_eq!(theme.as_bool(), None);
/// assert_eq!(FlagValue::boolean(true).as_bool(), Some(true));
/// assert_eq!(FlagValue::number(2.5).as_number(), Some(2.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl FlagValue {
    /// Boolean variant.
    pub fn boolean(value: bool) -> Self {
        Self::Bool(value)
    }

    /// String variant.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Numeric variant. Flags have a single number type.
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    /// The boolean, if this is a boolean variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The string, if this is a string variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a numeric variant.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    /// Convert an arbitrary JSON value, if it is one of the supported shapes.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
