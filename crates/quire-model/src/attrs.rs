//! Attribute values carried by nodes and marks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Attribute map. Ordered so equality and display are deterministic.
pub type Attrs = BTreeMap<SmolStr, AttrValue>;

/// A single attribute value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
}

/// The kind of an attribute value, used to validate attributes against
/// the kind of their declared default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrKind {
    Null,
    Bool,
    Int,
    Str,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrKind::Null => "null",
            AttrKind::Bool => "bool",
            AttrKind::Int => "int",
            AttrKind::Str => "string",
        };
        f.write_str(name)
    }
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Null => AttrKind::Null,
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Str(_) => AttrKind::Str,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(SmolStr::new(value))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(SmolStr::from(value))
    }
}

impl From<SmolStr> for AttrValue {
    fn from(value: SmolStr) -> Self {
        AttrValue::Str(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

/// Build an attribute map from key/value pairs.
///
/// ```
/// use quire_model::{attrs, AttrValue};
/// let a = attrs([("level", AttrValue::from(2))]);
/// assert_eq!(a["level"].as_int(), Some(2));
/// ```
pub fn attrs<K, V, I>(pairs: I) -> Attrs
where
    K: Into<SmolStr>,
    V: Into<AttrValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Checks, and may normalize, an attribute value. `Err` carries the reason
/// the value is rejected.
pub type AttrCoerce = fn(AttrValue) -> Result<AttrValue, String>;

/// Declared attribute of a node or mark type.
#[derive(Clone, Debug, Default)]
pub struct AttrSpec {
    /// Default value. An attribute without a default is required.
    pub default: Option<AttrValue>,
    /// Runs on every value once its kind has been checked.
    pub coerce: Option<AttrCoerce>,
}

impl AttrSpec {
    pub fn required() -> Self {
        Self::default()
    }

    pub fn with_default(value: impl Into<AttrValue>) -> Self {
        Self {
            default: Some(value.into()),
            coerce: None,
        }
    }

    pub fn coerce(mut self, f: AttrCoerce) -> Self {
        self.coerce = Some(f);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}
