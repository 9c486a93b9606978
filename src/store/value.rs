//! Typed Value Model
//!
//! This module defines the tagged unions stored under every key.
//! The variant of a value is decided at the type-system level, so a
//! type mismatch is a single discriminant check rather than runtime
//! type-name inspection.
//!
//! ## Value Kinds
//!
//! - [`Scalar`]: a single atomic value (integer, float, or string).
//!   Scalars are immutable once stored; a later `set` replaces them
//!   wholesale.
//! - [`Value::Hash`]: a field-name-to-value mapping, mutated in place
//!   by merge operations.
//! - [`Value::List`]: an ordered, append-only sequence, read by
//!   sub-range.
//!
//! `From` conversions are provided for the common scalar types so call
//! sites stay readable:
//!
//! ```
//! use emberkv::store::{Scalar, Value};
//!
//! let v: Value = 42i64.into();
//! assert_eq!(v, Value::Scalar(Scalar::Int(42)));
//!
//! let v: Value = "hello".into();
//! assert_eq!(v, Value::Scalar(Scalar::Str("hello".to_string())));
//! ```

use std::collections::HashMap;
use std::fmt;

/// A single atomic value: integer, float, or string.
///
/// This is the only kind of value accepted by `set`/`set_with_ttl` and
/// returned by `get`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A value stored under a key: scalar, hash, or list.
///
/// Exactly one variant lives under a key at any instant. Hash fields
/// and list elements carry full `Value`s, so nesting is representable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single atomic value
    Scalar(Scalar),
    /// A field-name-to-value mapping
    Hash(HashMap<String, Value>),
    /// An ordered sequence of values
    List(Vec<Value>),
}

impl Value {
    /// Returns the name of this value's kind ("scalar", "hash", or "list").
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
        }
    }

    /// Returns the scalar inside this value, if it is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the field name carried by this value, if it is a string
    /// scalar. Hash merge arguments use this for the name positions.
    pub(crate) fn as_field_name(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Int(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Str(s))
    }
}
