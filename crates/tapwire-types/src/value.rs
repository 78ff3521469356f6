//! The protocol value universe.
//!
//! Every payload that crosses the control channel is a [`Value`]: a
//! conservative, self-describing structure of strings, integers, booleans,
//! sequences, string-keyed maps, and `None`. The wire representation
//! (bincode + base64 armor) lives in `tapwire-protocol`; this module only
//! defines the structure and conversions.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a [`Value`] does not have the expected shape.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("expected {expected}, got {got}")]
    Shape {
        expected: &'static str,
        got: &'static str,
    },

    #[error("sequence of length {expected} expected, got {got}")]
    Arity { expected: usize, got: usize },
}

/// A structured protocol value.
///
/// Sequences and tuples both map to `List`; map keys are always strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Name of the variant, for shape errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(ValueError::Shape {
                expected: "int",
                got: other.kind(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(ValueError::Shape {
                expected: "string",
                got: other.kind(),
            }),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(ValueError::Shape {
                expected: "list",
                got: other.kind(),
            }),
        }
    }

    /// Interpret as a fixed-arity tuple.
    pub fn as_tuple(&self, len: usize) -> Result<&[Value], ValueError> {
        let items = self.as_list()?;
        if items.len() == len {
            Ok(items)
        } else {
            Err(ValueError::Arity {
                expected: len,
                got: items.len(),
            })
        }
    }

    /// A string, or `None` standing in for the absence of one.
    pub fn as_opt_str(&self) -> Result<Option<&str>, ValueError> {
        match self {
            Value::None => Ok(None),
            other => other.as_str().map(Some),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::None,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bincode_roundtrip_nested() {
        let value = Value::List(vec![
            Value::None,
            Value::Bool(true),
            Value::Int(-7),
            Value::Str("hello".to_string()),
            Value::Map(vec![("k".to_string(), Value::Int(1))]),
        ]);
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&value, config).unwrap();
        let (decoded, _): (Value, _) = bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn tuple_arity_checked() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(value.as_tuple(2).is_ok());
        assert!(matches!(
            value.as_tuple(3),
            Err(ValueError::Arity { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn shape_errors_name_both_sides() {
        let err = Value::Str("x".to_string()).as_int().unwrap_err();
        assert_eq!(err.to_string(), "expected int, got string");
    }

    #[test]
    fn opt_str_treats_none_as_absent() {
        assert_eq!(Value::None.as_opt_str().unwrap(), None);
        assert_eq!(
            Value::Str("a".to_string()).as_opt_str().unwrap(),
            Some("a")
        );
    }
}
