use std::collections::BTreeSet;
use std::fmt;

use recmap::{
    FieldDefinition, IndexDefinition, SchemaError, SchemaRegistry, TableSchema, TypeDefinition,
};

use crate::schema::{parse_field_kind, SchemaFile};
use crate::validator::{validate_schema, ValidationError};

/// Failure loading a table definition.
#[derive(Debug)]
pub enum SchemaLoadError {
    /// The TOML source did not parse.
    Parse(String),
    /// The parsed definition failed declarative validation.
    Validation(Vec<ValidationError>),
    /// The compiled schema failed the core model invariants.
    Schema(SchemaError),
}

impl fmt::Display for SchemaLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "schema parse error: {msg}"),
            Self::Validation(errors) => {
                write!(f, "schema validation failed:")?;
                for e in errors {
                    write!(f, "\n  {e}")?;
                }
                Ok(())
            }
            Self::Schema(e) => write!(f, "schema error: {e}"),
        }
    }
}

impl std::error::Error for SchemaLoadError {}

impl From<SchemaError> for SchemaLoadError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

/// Compile a parsed and validated definition into the core schema model.
pub fn compile(file: &SchemaFile) -> Result<TableSchema, SchemaLoadError> {
    validate_schema(file).map_err(SchemaLoadError::Validation)?;

    let declared: BTreeSet<&str> = file.types.iter().map(|t| t.name.as_str()).collect();

    let types = file
        .types
        .iter()
        .map(|ty| {
            let fields = ty
                .fields
                .iter()
                .map(|f| {
                    // Validation guarantees the kind parses.
                    let kind = parse_field_kind(&f.field_type, &declared)
                        .expect("validated field type");
                    let mut field = FieldDefinition::new(f.name.clone(), kind);
                    if let Some(storage) = &f.storage {
                        field = field.stored_as(storage.clone());
                    }
                    if let Some(id) = &f.keyed_by {
                        field = field.keyed_by(id.clone());
                    }
                    if f.compress {
                        field = field.compressed();
                    }
                    if f.ttl {
                        field = field.ttl();
                    }
                    field
                })
                .collect();
            let mut def = TypeDefinition::new(ty.name.clone(), fields);
            def.equals_fields = ty.equals_fields.clone();
            def.hash_code_fields = ty.hash_code_fields.clone();
            def
        })
        .collect();

    let table = &file.table;
    let mut builder = TableSchema::builder(&table.name, &table.root, &table.hash_key)
        .version(table.version)
        .optimistic_locking(table.optimistic_locking)
        .enable_migrations(table.enable_migrations)
        .types(types);
    if let Some(d) = &table.description {
        builder = builder.description(d.clone());
    }
    if let Some(r) = &table.range_key {
        builder = builder.range_key(r.clone());
    }
    if let Some(attr) = &table.schema_version_field {
        builder = builder.schema_version_attr(attr.clone());
    }
    if let Some(attr) = &table.revision_field {
        builder = builder.revision_attr(attr.clone());
    }
    for index in &table.global_indexes {
        builder = builder.global_index(IndexDefinition {
            name: index.name.clone(),
            hash_key: index.hash_key.clone(),
            range_key: index.range_key.clone(),
        });
    }
    for index in &table.local_indexes {
        builder = builder.local_index(IndexDefinition {
            name: index.name.clone(),
            hash_key: index.hash_key.clone(),
            range_key: index.range_key.clone(),
        });
    }
    Ok(builder.build()?)
}

/// Parse and compile one table definition from TOML source.
pub fn load_table(source: &str) -> Result<TableSchema, SchemaLoadError> {
    let file: SchemaFile =
        toml::from_str(source).map_err(|e| SchemaLoadError::Parse(e.to_string()))?;
    compile(&file)
}

/// Load a registry from several table definition sources.
///
/// All definitions are validated before any is registered: a malformed
/// definition fails the whole load, never the first use.
pub fn load_registry<'a>(
    sources: impl IntoIterator<Item = &'a str>,
) -> Result<SchemaRegistry, SchemaLoadError> {
    let mut registry = SchemaRegistry::new();
    for source in sources {
        registry.register(load_table(source)?);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap::{FieldKind, KeyedListPath};

    const PLAYERS: &str = r#"
[table]
name = "players"
root = "Player"
hash_key = "player_id"
range_key = "sequence"
version = 1
optimistic_locking = true

[[table.global_index]]
name = "alias_index"
hash_key = "alias"
range_key = "sequence"

[[type]]
name = "Player"
fields = [
    { name = "player_id", storage = "id", type = "string" },
    { name = "sequence", storage = "seq", type = "number" },
    { name = "alias", type = "string" },
    { name = "stats", storage = "st", type = "Stats" },
    { name = "inventory", storage = "inv", type = "list<Item>", keyed_by = "id" },
]

[[type]]
name = "Stats"
fields = [
    { name = "bio", type = "string" },
    { name = "history", storage = "hist", type = "list<string>", compress = true },
]

[[type]]
name = "Item"
fields = [
    { name = "id", type = "string" },
    { name = "count", type = "number" },
]
"#;

    #[test]
    fn compiles_full_definition() {
        let schema = load_table(PLAYERS).unwrap();
        assert_eq!(schema.table_name(), "players");
        assert_eq!(schema.version(), 1);
        assert!(schema.optimistic_locking());
        assert_eq!(schema.field("player_id").storage, "id");
        assert_eq!(
            schema.field("stats").kind,
            FieldKind::Object("Stats".to_string())
        );
        assert!(schema.index("alias_index").is_some());
        assert_eq!(
            schema.keyed_list_paths(),
            &[KeyedListPath {
                parent: None,
                attr: "inv".to_string(),
                id_attr: "id".to_string(),
            }]
        );
        assert_eq!(schema.compressed_paths().len(), 1);
        assert_eq!(
            schema.compressed_paths()[0].parent.as_deref(),
            Some("st")
        );
    }

    #[test]
    fn parse_error_is_reported() {
        let err = load_table("not toml [").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Parse(_)));
    }

    #[test]
    fn validation_errors_are_collected() {
        let source = r#"
[table]
name = "players"
root = "Player"
hash_key = "player_id"

[[type]]
name = "player"
fields = [
    { name = "player_id", type = "wibble" },
]
"#;
        let err = load_table(source).unwrap_err();
        match err {
            SchemaLoadError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other}"),
        }
    }

    #[test]
    fn core_invariants_enforced_at_load() {
        // Parses and passes declarative validation, but the hash key does
        // not exist in the root type.
        let source = r#"
[table]
name = "players"
root = "Player"
hash_key = "missing"

[[type]]
name = "Player"
fields = [
    { name = "player_id", type = "string" },
]
"#;
        let err = load_table(source).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Schema(_)));
    }

    #[test]
    fn registry_loads_multiple_tables() {
        let dummy = r#"
[table]
name = "docs"
root = "Doc"
hash_key = "id"
optimistic_locking = true

[[type]]
name = "Doc"
fields = [
    { name = "id", type = "string" },
    { name = "name", type = "string" },
    { name = "weight", type = "number" },
]
"#;
        let registry = load_registry([PLAYERS, dummy]).unwrap();
        assert!(registry.get("players").is_some());
        assert!(registry.get("docs").is_some());
    }
}
