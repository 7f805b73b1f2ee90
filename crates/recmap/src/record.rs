use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::value::{AttrValue, RawItem};

/// Primary key of one record: hash key value plus optional range key value.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordKey {
    /// Hash (partition) key value.
    pub hash: AttrValue,
    /// Range (sort) key value, for tables that declare one.
    pub range: Option<AttrValue>,
}

impl RecordKey {
    /// Key with only a hash value.
    pub fn hash(hash: impl Into<AttrValue>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// Key with hash and range values.
    pub fn hash_range(hash: impl Into<AttrValue>, range: impl Into<AttrValue>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }
}

/// A typed, keyed entity stored in one table.
///
/// Implementations are plain structs converting to and from the raw
/// attribute representation; nothing here is derived at runtime. The access
/// layer never retains a record across calls — the caller owns it.
///
/// # Example
///
/// ```
/// use recmap::{AttrValue, Record, RecordError, RecordKey, RawItem, required};
///
/// struct Counter {
///     id: String,
///     value: i64,
/// }
///
/// impl Record for Counter {
///     fn table_name() -> &'static str {
///         "counters"
///     }
///     fn key(&self) -> RecordKey {
///         RecordKey::hash(self.id.as_str())
///     }
///     fn to_item(&self) -> RawItem {
///         let mut item = RawItem::new();
///         item.insert("id".into(), AttrValue::from(self.id.as_str()));
///         item.insert("value".into(), AttrValue::from(self.value));
///         item
///     }
///     fn from_item(item: &RawItem) -> Result<Self, RecordError> {
///         Ok(Self {
///             id: required(item, "id")?.as_str().unwrap_or_default().into(),
///             value: required(item, "value")?
///                 .as_i64()
///                 .ok_or(RecordError::UnexpectedKind {
///                     attr: "value".into(),
///                     expected: "number",
///                 })?,
///         })
///     }
/// }
/// ```
pub trait Record: Sized {
    /// Logical name of the table this record belongs to.
    fn table_name() -> &'static str;

    /// The record's primary key.
    fn key(&self) -> RecordKey;

    /// Current optimistic-locking revision, if the record has been persisted.
    fn revision(&self) -> Option<u64> {
        None
    }

    /// Store the revision observed when the record was loaded or written.
    fn set_revision(&mut self, _revision: u64) {}

    /// Serialize into the raw attribute representation.
    fn to_item(&self) -> RawItem;

    /// Deserialize from the raw attribute representation.
    fn from_item(item: &RawItem) -> Result<Self, RecordError>;
}

/// Failure converting between a typed record and its raw representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required attribute is absent.
    MissingAttribute {
        /// Storage name of the missing attribute.
        attr: String,
    },
    /// An attribute holds a different kind of value than declared.
    UnexpectedKind {
        /// Storage name of the attribute.
        attr: String,
        /// What the record expected to find.
        expected: &'static str,
    },
    /// Implementation-specific conversion failure.
    Other(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute { attr } => write!(f, "missing attribute `{attr}`"),
            Self::UnexpectedKind { attr, expected } => {
                write!(f, "attribute `{attr}` is not a {expected}")
            }
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordError {}

/// Fetch a required attribute from a raw item.
pub fn required<'a>(item: &'a RawItem, attr: &str) -> Result<&'a AttrValue, RecordError> {
    item.get(attr).ok_or_else(|| RecordError::MissingAttribute {
        attr: String::from(attr),
    })
}

/// Fetch a required string attribute.
pub fn required_str<'a>(item: &'a RawItem, attr: &str) -> Result<&'a str, RecordError> {
    required(item, attr)?
        .as_str()
        .ok_or(RecordError::UnexpectedKind {
            attr: String::from(attr),
            expected: "string",
        })
}

/// Fetch a required integer attribute.
pub fn required_i64(item: &RawItem, attr: &str) -> Result<i64, RecordError> {
    required(item, attr)?
        .as_i64()
        .ok_or(RecordError::UnexpectedKind {
            attr: String::from(attr),
            expected: "number",
        })
}

/// Fetch an optional string attribute (`None` when absent or null).
pub fn optional_str<'a>(item: &'a RawItem, attr: &str) -> Option<&'a str> {
    item.get(attr).and_then(AttrValue::as_str)
}

/// Fetch an optional integer attribute (`None` when absent or null).
pub fn optional_i64(item: &RawItem, attr: &str) -> Option<i64> {
    item.get(attr).and_then(AttrValue::as_i64)
}

/// Fetch an optional list attribute as a vec of strings, skipping non-strings.
pub fn optional_str_list(item: &RawItem, attr: &str) -> Vec<String> {
    item.get(attr)
        .and_then(AttrValue::as_list)
        .map(|l| {
            l.iter()
                .filter_map(AttrValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_reports_missing() {
        let item = RawItem::new();
        let err = required(&item, "id").unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingAttribute {
                attr: String::from("id")
            }
        );
    }

    #[test]
    fn required_str_rejects_numbers() {
        let mut item = RawItem::new();
        item.insert(String::from("id"), AttrValue::from(1i64));
        let err = required_str(&item, "id").unwrap_err();
        assert!(matches!(err, RecordError::UnexpectedKind { .. }));
    }

    #[test]
    fn optional_accessors() {
        let mut item = RawItem::new();
        item.insert(String::from("name"), AttrValue::from("x"));
        assert_eq!(optional_str(&item, "name"), Some("x"));
        assert_eq!(optional_str(&item, "missing"), None);
        assert_eq!(optional_i64(&item, "name"), None);
    }
}
