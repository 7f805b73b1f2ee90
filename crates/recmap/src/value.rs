use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// A raw item as stored by the backing item store: attribute name → value.
///
/// `BTreeMap` keeps attribute order deterministic, which matters for
/// reproducible expressions and stable test output.
pub type RawItem = BTreeMap<String, AttrValue>;

/// A numeric attribute value.
///
/// The store models numbers as a single scalar type; integers and floats are
/// kept apart in memory so that counter arithmetic stays exact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Number {
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
}

impl Number {
    /// The value as a float, regardless of representation.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }

    /// The value as an integer, if it is one.
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(n),
            Self::Float(_) => None,
        }
    }

    /// Sum of two numbers. Int + Int stays exact; anything else goes float.
    #[must_use]
    pub fn plus(self, other: Number) -> Number {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.wrapping_add(b)),
            (a, b) => Self::Float(a.as_f64() + b.as_f64()),
        }
    }

    /// Numeric comparison across representations.
    #[must_use]
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// An attribute value in the item store's wire model.
///
/// This is the "raw" representation every layer agrees on: records serialize
/// into it, update expressions carry it, migrations rewrite it, and the store
/// persists it.
///
/// # Example
///
/// ```
/// use recmap::AttrValue;
///
/// let v = AttrValue::from("hello");
/// assert_eq!(v.as_str(), Some("hello"));
///
/// let n = AttrValue::from(42i64);
/// assert_eq!(n.as_i64(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    /// UTF-8 string.
    Str(String),
    /// Number (integer or float).
    Num(Number),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
    /// Opaque binary blob.
    Bytes(Vec<u8>),
    /// Set of unique strings.
    StrSet(BTreeSet<String>),
    /// Set of unique numbers.
    NumSet(Vec<Number>),
    /// Ordered list of values.
    List(Vec<AttrValue>),
    /// String-keyed map of values.
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Borrow as a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a number.
    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    /// Borrow as a float (integers convert).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    /// Borrow as a bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow as a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<AttrValue>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Borrow as a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow as a map.
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, AttrValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as a string set.
    #[must_use]
    pub fn as_str_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::StrSet(s) => Some(s),
            _ => None,
        }
    }

    /// True if this is the explicit null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Ordering between two comparable values (numbers with numbers,
    /// strings with strings). Anything else is not comparable.
    #[must_use]
    pub fn compare(&self, other: &AttrValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => a.compare(*b),
            (Self::Str(a), Self::Str(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(String::from(s))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Num(Number::Int(n))
    }
}

impl From<u64> for AttrValue {
    fn from(n: u64) -> Self {
        Self::Num(Number::Int(n as i64))
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        Self::Num(Number::Float(f))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Number> for AttrValue {
    fn from(n: Number) -> Self {
        Self::Num(n)
    }
}

impl<V: Into<AttrValue>> From<Vec<V>> for AttrValue {
    fn from(items: Vec<V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
