use std::collections::BTreeMap;
use std::fmt;

use recmap::{AttrValue, RawItem, TableSchema};

/// Zstd level for compressed collection attributes.
const COMPRESSION_LEVEL: i32 = 3;

/// Failure converting an item between its caller-visible and stored shapes.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// A keyed list element is not a map or lacks its id attribute.
    BadElement {
        /// Storage name of the list attribute.
        attr: String,
        /// The element id attribute that was expected.
        id_attr: String,
    },
    /// A structural attribute holds an unexpected kind of value.
    BadShape {
        /// Storage name of the attribute.
        attr: String,
        /// What the codec expected to find.
        expected: &'static str,
    },
    /// JSON serialization of a compressed collection failed.
    Json(String),
    /// Compression or decompression failed.
    Compression(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadElement { attr, id_attr } => write!(
                f,
                "keyed list `{attr}`: element is missing string id attribute `{id_attr}`"
            ),
            Self::BadShape { attr, expected } => {
                write!(f, "attribute `{attr}` is not a {expected}")
            }
            Self::Json(msg) => write!(f, "json error: {msg}"),
            Self::Compression(msg) => write!(f, "compression error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Convert an item from its caller-visible shape to its stored shape:
/// keyed lists become id-keyed maps (enabling stable partial updates of
/// individual elements) and compressed collections become one opaque
/// binary attribute.
pub fn encode_item(schema: &TableSchema, item: &mut RawItem) -> Result<(), CodecError> {
    for path in schema.keyed_list_paths() {
        let Some(container) = container_mut(item, path.parent.as_deref()) else {
            continue;
        };
        let Some(value) = container.remove(&path.attr) else {
            continue;
        };
        let list = match value {
            AttrValue::List(list) => list,
            other => {
                // Already in stored shape (e.g. re-encoding a raw read).
                container.insert(path.attr.clone(), other);
                continue;
            }
        };
        let mut keyed = BTreeMap::new();
        for element in list {
            let id = element
                .as_map()
                .and_then(|m| m.get(&path.id_attr))
                .and_then(AttrValue::as_str)
                .ok_or_else(|| CodecError::BadElement {
                    attr: path.attr.clone(),
                    id_attr: path.id_attr.clone(),
                })?
                .to_string();
            keyed.insert(id, element);
        }
        container.insert(path.attr.clone(), AttrValue::Map(keyed));
    }

    for path in schema.compressed_paths() {
        let Some(container) = container_mut(item, path.parent.as_deref()) else {
            continue;
        };
        let Some(value) = container.remove(&path.attr) else {
            continue;
        };
        let json = serde_json::to_vec(&value).map_err(|e| CodecError::Json(e.to_string()))?;
        let compressed = zstd::stream::encode_all(json.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        container.insert(path.attr.clone(), AttrValue::Bytes(compressed));
    }

    Ok(())
}

/// Convert an item from its stored shape back to its caller-visible shape:
/// compressed attributes inflate, and id-keyed maps become sequences
/// ordered by element id.
pub fn decode_item(schema: &TableSchema, item: &mut RawItem) -> Result<(), CodecError> {
    for path in schema.compressed_paths() {
        let Some(container) = container_mut(item, path.parent.as_deref()) else {
            continue;
        };
        let Some(value) = container.remove(&path.attr) else {
            continue;
        };
        let bytes = match value {
            AttrValue::Bytes(bytes) => bytes,
            other => {
                // Stored before the field was flagged; pass through as-is.
                container.insert(path.attr.clone(), other);
                continue;
            }
        };
        let json = zstd::stream::decode_all(bytes.as_slice())
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        let value: AttrValue =
            serde_json::from_slice(&json).map_err(|e| CodecError::Json(e.to_string()))?;
        container.insert(path.attr.clone(), value);
    }

    for path in schema.keyed_list_paths() {
        let Some(container) = container_mut(item, path.parent.as_deref()) else {
            continue;
        };
        let Some(value) = container.remove(&path.attr) else {
            continue;
        };
        let keyed = match value {
            AttrValue::Map(map) => map,
            other => {
                container.insert(path.attr.clone(), other);
                continue;
            }
        };
        // BTreeMap iteration gives a stable, id-ordered sequence.
        let list = keyed.into_values().collect();
        container.insert(path.attr.clone(), AttrValue::List(list));
    }

    Ok(())
}

fn container_mut<'a>(
    item: &'a mut RawItem,
    parent: Option<&str>,
) -> Option<&'a mut BTreeMap<String, AttrValue>> {
    match parent {
        None => Some(item),
        Some(attr) => item.get_mut(attr).and_then(AttrValue::as_map_mut),
    }
}
