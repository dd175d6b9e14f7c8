//! Property values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed property value stored on a node.
///
/// The store does not interpret values; type names and property names
/// come from external lexicons and are treated as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A string value.
    String(String),
    /// A boolean value.
    Bool(bool),
    /// A 64-bit integer value.
    Long(i64),
    /// A 64-bit floating point value.
    Double(f64),
    /// An opaque binary value.
    Binary(Vec<u8>),
    /// An ordered multi-valued property.
    Multi(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Returns the string contents, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean contents, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer contents, if this is a long value.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the binary contents, if this is a binary value.
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Binary(b) => write!(f, "<binary {} bytes>", b.len()),
            Self::Multi(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(PropertyValue::from("x").as_str(), Some("x"));
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from(7i64).as_long(), Some(7));
    }

    #[test]
    fn wrong_type_accessors_return_none() {
        let v = PropertyValue::from("text");
        assert!(v.as_bool().is_none());
        assert!(v.as_long().is_none());
        assert!(v.as_binary().is_none());
    }

    #[test]
    fn multi_display() {
        let v = PropertyValue::Multi(vec![PropertyValue::Long(1), PropertyValue::Long(2)]);
        assert_eq!(format!("{v}"), "[1, 2]");
    }
}
