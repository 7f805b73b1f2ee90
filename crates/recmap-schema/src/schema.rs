use std::collections::BTreeSet;

use recmap::FieldKind;
use serde::Deserialize;

/// Top-level structure of one table definition file.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaFile {
    /// Table-level configuration.
    pub table: TableConfig,
    /// Declared record types (root type plus nested embedded types).
    #[serde(rename = "type", default)]
    pub types: Vec<TypeConfig>,
}

/// Table-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Logical table name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Name of the root record type.
    pub root: String,
    /// Logical name of the hash key field.
    pub hash_key: String,
    /// Logical name of the range key field, if any.
    pub range_key: Option<String>,
    /// Current schema version. Non-negative; increases across deployments.
    #[serde(default)]
    pub version: u32,
    /// Enable optimistic locking for this table.
    #[serde(default)]
    pub optimistic_locking: bool,
    /// Enable read-time migrations (default true).
    #[serde(default = "default_true")]
    pub enable_migrations: bool,
    /// Override the schema-version attribute name (default `_schv`).
    pub schema_version_field: Option<String>,
    /// Override the revision attribute name (default `_rv`).
    pub revision_field: Option<String>,
    /// Global secondary indexes.
    #[serde(rename = "global_index", default)]
    pub global_indexes: Vec<IndexConfig>,
    /// Local secondary indexes.
    #[serde(rename = "local_index", default)]
    pub local_indexes: Vec<IndexConfig>,
}

fn default_true() -> bool {
    true
}

/// A secondary index declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Index name, referenced by queries.
    pub name: String,
    /// Logical name of the index hash key field.
    pub hash_key: String,
    /// Logical name of the index range key field, if any.
    pub range_key: Option<String>,
}

/// A record type declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    /// Type name in PascalCase (e.g., `"Player"`).
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    /// Field subset scoping equality in generated accessors.
    pub equals_fields: Option<Vec<String>>,
    /// Field subset scoping hash computation in generated accessors.
    pub hash_code_fields: Option<Vec<String>>,
}

/// A field declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Logical field name in snake_case.
    pub name: String,
    /// Wire/storage attribute name; defaults to the logical name.
    pub storage: Option<String>,
    /// Declared type: `"string"`, `"number"`, `"bool"`, `"binary"`,
    /// `"string_set"`, `"number_set"`, `"list<...>"`, `"map<...>"`, or the
    /// name of a declared type.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Store this list as a map keyed by the named element attribute.
    pub keyed_by: Option<String>,
    /// Store this collection compressed.
    #[serde(default)]
    pub compress: bool,
    /// This field holds the record's expiry epoch.
    #[serde(default)]
    pub ttl: bool,
}

/// Parse a declared type string into a [`FieldKind`].
///
/// `declared` is the set of type names defined in the same file; a bare
/// PascalCase name resolves to an embedded object of that type.
#[must_use]
pub fn parse_field_kind(ty: &str, declared: &BTreeSet<&str>) -> Option<FieldKind> {
    let ty = ty.trim();
    match ty {
        "string" => return Some(FieldKind::String),
        "number" => return Some(FieldKind::Number),
        "bool" => return Some(FieldKind::Bool),
        "binary" => return Some(FieldKind::Binary),
        "string_set" => return Some(FieldKind::StringSet),
        "number_set" => return Some(FieldKind::NumberSet),
        _ => {}
    }
    if let Some(inner) = ty.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
        return parse_field_kind(inner, declared).map(|k| FieldKind::List(Box::new(k)));
    }
    if let Some(inner) = ty.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
        return parse_field_kind(inner, declared).map(|k| FieldKind::Map(Box::new(k)));
    }
    if declared.contains(ty) {
        return Some(FieldKind::Object(ty.to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_schema() {
        let toml = r#"
[table]
name = "players"
root = "Player"
hash_key = "player_id"
version = 1

[[type]]
name = "Player"
fields = [
    { name = "player_id", type = "string" },
    { name = "alias", type = "string" },
]
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        assert_eq!(schema.table.name, "players");
        assert_eq!(schema.table.root, "Player");
        assert!(schema.table.enable_migrations);
        assert!(!schema.table.optimistic_locking);
        assert_eq!(schema.types.len(), 1);
        assert_eq!(schema.types[0].fields.len(), 2);
    }

    #[test]
    fn parse_full_table_config() {
        let toml = r#"
[table]
name = "players"
description = "Player profiles"
root = "Player"
hash_key = "player_id"
range_key = "sequence"
version = 3
optimistic_locking = true
enable_migrations = false
schema_version_field = "_v"
revision_field = "_r"

[[table.global_index]]
name = "alias_index"
hash_key = "alias"
range_key = "sequence"

[[table.local_index]]
name = "weight_index"
hash_key = "player_id"
range_key = "weight"

[[type]]
name = "Player"
equals_fields = ["player_id"]
fields = [
    { name = "player_id", type = "string" },
    { name = "sequence", type = "number" },
    { name = "alias", type = "string" },
    { name = "weight", type = "number" },
]
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        let table = &schema.table;
        assert_eq!(table.version, 3);
        assert!(table.optimistic_locking);
        assert!(!table.enable_migrations);
        assert_eq!(table.schema_version_field.as_deref(), Some("_v"));
        assert_eq!(table.revision_field.as_deref(), Some("_r"));
        assert_eq!(table.global_indexes.len(), 1);
        assert_eq!(table.local_indexes[0].range_key.as_deref(), Some("weight"));
        assert_eq!(
            schema.types[0].equals_fields.as_deref(),
            Some(&["player_id".to_string()][..])
        );
    }

    #[test]
    fn parse_structural_flags() {
        let toml = r#"
[table]
name = "players"
root = "Player"
hash_key = "player_id"

[[type]]
name = "Player"
fields = [
    { name = "player_id", type = "string", storage = "id" },
    { name = "inventory", type = "list<Item>", storage = "inv", keyed_by = "id" },
    { name = "history", type = "list<string>", compress = true },
    { name = "expires_at", type = "number", ttl = true },
]

[[type]]
name = "Item"
fields = [
    { name = "id", type = "string" },
    { name = "count", type = "number" },
]
"#;
        let schema: SchemaFile = toml::from_str(toml).unwrap();
        let fields = &schema.types[0].fields;
        assert_eq!(fields[0].storage.as_deref(), Some("id"));
        assert_eq!(fields[1].keyed_by.as_deref(), Some("id"));
        assert!(fields[2].compress);
        assert!(fields[3].ttl);
    }

    #[test]
    fn field_kind_parsing() {
        let declared: BTreeSet<&str> = ["Item"].into_iter().collect();
        assert_eq!(
            parse_field_kind("string", &declared),
            Some(FieldKind::String)
        );
        assert_eq!(
            parse_field_kind("list<number>", &declared),
            Some(FieldKind::List(Box::new(FieldKind::Number)))
        );
        assert_eq!(
            parse_field_kind("map<list<string>>", &declared),
            Some(FieldKind::Map(Box::new(FieldKind::List(Box::new(
                FieldKind::String
            )))))
        );
        assert_eq!(
            parse_field_kind("Item", &declared),
            Some(FieldKind::Object("Item".to_string()))
        );
        assert_eq!(parse_field_kind("Ghost", &declared), None);
        assert_eq!(parse_field_kind("list<Ghost>", &declared), None);
    }
}
