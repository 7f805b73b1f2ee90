use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// Default storage name of the per-record schema-version attribute.
pub const DEFAULT_SCHEMA_VERSION_ATTR: &str = "_schv";

/// Default storage name of the optimistic-locking revision attribute.
pub const DEFAULT_REVISION_ATTR: &str = "_rv";

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// Number (integer or float).
    Number,
    /// Boolean.
    Bool,
    /// Opaque binary.
    Binary,
    /// Set of unique strings.
    StringSet,
    /// Set of unique numbers.
    NumberSet,
    /// Ordered list of an element kind.
    List(Box<FieldKind>),
    /// String-keyed map of a value kind.
    Map(Box<FieldKind>),
    /// A nested type declared in the same table schema.
    Object(String),
}

impl FieldKind {
    /// The declared nested type name, if this field embeds one.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// True for list/map/set kinds.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::StringSet | Self::NumberSet | Self::List(_) | Self::Map(_)
        )
    }
}

/// A single field of a record type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Logical name used by callers.
    pub name: String,
    /// Wire/storage attribute name.
    pub storage: String,
    /// Declared type.
    pub kind: FieldKind,
    /// When set, this list field is stored as a map keyed by the named
    /// element attribute, so individual elements can be updated in place.
    /// Callers still see an ordered sequence.
    pub keyed_by: Option<String>,
    /// Store this collection as a single compressed binary attribute.
    pub compress: bool,
    /// This field holds the record's expiry epoch (at most one per table).
    pub ttl: bool,
}

impl FieldDefinition {
    /// A plain field with storage name equal to the logical name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            storage: name.clone(),
            name,
            kind,
            keyed_by: None,
            compress: false,
            ttl: false,
        }
    }

    /// Override the storage attribute name.
    #[must_use]
    pub fn stored_as(mut self, storage: impl Into<String>) -> Self {
        self.storage = storage.into();
        self
    }

    /// Store this list as a map keyed by the given element attribute.
    #[must_use]
    pub fn keyed_by(mut self, element_id: impl Into<String>) -> Self {
        self.keyed_by = Some(element_id.into());
        self
    }

    /// Store this collection compressed.
    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Mark as the TTL field.
    #[must_use]
    pub fn ttl(mut self) -> Self {
        self.ttl = true;
        self
    }
}

/// A record type: the root type of a table, or a nested embedded type.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Type name (unique within the table schema).
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDefinition>,
    /// Field subset scoping equality comparisons in generated accessors.
    pub equals_fields: Option<Vec<String>>,
    /// Field subset scoping hash computation in generated accessors.
    pub hash_code_fields: Option<Vec<String>>,
}

impl TypeDefinition {
    /// A type with the given fields and no equality/hash scoping.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
            equals_fields: None,
            hash_code_fields: None,
        }
    }

    /// Look up a field by logical name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A global or local secondary index over the table.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// Index name, referenced by queries.
    pub name: String,
    /// Logical name of the index hash key field.
    pub hash_key: String,
    /// Logical name of the index range key field, if any.
    pub range_key: Option<String>,
}

/// Storage path of a list field persisted as an id-keyed map.
///
/// `parent` is the storage name of the embedding field when the list lives
/// inside a nested type, `None` for root-level fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedListPath {
    /// Storage name of the embedding object field, if nested.
    pub parent: Option<String>,
    /// Storage name of the list attribute itself.
    pub attr: String,
    /// Element attribute holding each element's identity.
    pub id_attr: String,
}

/// Storage path of a collection persisted as a compressed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPath {
    /// Storage name of the embedding object field, if nested.
    pub parent: Option<String>,
    /// Storage name of the collection attribute itself.
    pub attr: String,
}

/// Schema construction/validation failure. Raised eagerly at registry load,
/// never at first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The declared root type is not among the declared types.
    UnknownRootType { table: String, root: String },
    /// A key field (hash/range) does not exist in the root type.
    UnknownKeyField { table: String, field: String },
    /// More than one field across the type tree is flagged as TTL.
    MultipleTtlFields { table: String, count: usize },
    /// An equals-fields entry names a field absent from its type.
    UnknownEqualsField {
        table: String,
        type_name: String,
        field: String,
    },
    /// A hash-code-fields entry names a field absent from its type.
    UnknownHashCodeField {
        table: String,
        type_name: String,
        field: String,
    },
    /// An index key names a field absent from the root type.
    UnknownIndexField {
        table: String,
        index: String,
        field: String,
    },
    /// A field's declared type names neither a scalar nor a declared type.
    UnknownFieldType {
        table: String,
        type_name: String,
        field: String,
        referenced: String,
    },
    /// Two types share a name.
    DuplicateTypeName { table: String, type_name: String },
    /// Two fields of one type share a logical or storage name.
    DuplicateFieldName {
        table: String,
        type_name: String,
        field: String,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRootType { table, root } => {
                write!(f, "table {table}: root type `{root}` is not declared")
            }
            Self::UnknownKeyField { table, field } => {
                write!(f, "table {table}: key field `{field}` does not exist")
            }
            Self::MultipleTtlFields { table, count } => {
                write!(
                    f,
                    "table {table}: {count} ttl fields defined, at most one is allowed"
                )
            }
            Self::UnknownEqualsField {
                table,
                type_name,
                field,
            } => write!(
                f,
                "table {table}, type {type_name}: invalid equals field `{field}`"
            ),
            Self::UnknownHashCodeField {
                table,
                type_name,
                field,
            } => write!(
                f,
                "table {table}, type {type_name}: invalid hash-code field `{field}`"
            ),
            Self::UnknownIndexField {
                table,
                index,
                field,
            } => write!(
                f,
                "table {table}, index {index}: key field `{field}` does not exist"
            ),
            Self::UnknownFieldType {
                table,
                type_name,
                field,
                referenced,
            } => write!(
                f,
                "table {table}, type {type_name}, field {field}: unknown type `{referenced}`"
            ),
            Self::DuplicateTypeName { table, type_name } => {
                write!(f, "table {table}: duplicate type name `{type_name}`")
            }
            Self::DuplicateFieldName {
                table,
                type_name,
                field,
            } => write!(
                f,
                "table {table}, type {type_name}: duplicate field name `{field}`"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SchemaError {}

/// Immutable description of one table: keys, version, types, indexes, and
/// the structural field encodings derived from them.
///
/// Built once at startup (usually through `recmap-schema`), validated
/// eagerly, then shared read-only for the process lifetime.
///
/// # Example
///
/// ```
/// use recmap::{FieldDefinition, FieldKind, TableSchema, TypeDefinition};
///
/// let schema = TableSchema::builder("players", "Player", "player_id")
///     .version(1)
///     .types(vec![TypeDefinition::new(
///         "Player",
///         vec![
///             FieldDefinition::new("player_id", FieldKind::String),
///             FieldDefinition::new("name", FieldKind::String),
///         ],
///     )])
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.field("name").storage, "name");
/// ```
#[derive(Debug)]
pub struct TableSchema {
    table_name: String,
    description: Option<String>,
    root_type: String,
    hash_key: String,
    range_key: Option<String>,
    version: u32,
    optimistic_locking: bool,
    enable_migrations: bool,
    schema_version_attr: String,
    revision_attr: String,
    global_indexes: Vec<IndexDefinition>,
    local_indexes: Vec<IndexDefinition>,
    types: Vec<TypeDefinition>,
    keyed_list_paths: Vec<KeyedListPath>,
    compressed_paths: Vec<CompressedPath>,
}

/// Builder for [`TableSchema`]. `build()` validates eagerly.
pub struct TableSchemaBuilder {
    table_name: String,
    description: Option<String>,
    root_type: String,
    hash_key: String,
    range_key: Option<String>,
    version: u32,
    optimistic_locking: bool,
    enable_migrations: bool,
    schema_version_attr: String,
    revision_attr: String,
    global_indexes: Vec<IndexDefinition>,
    local_indexes: Vec<IndexDefinition>,
    types: Vec<TypeDefinition>,
}

impl TableSchemaBuilder {
    /// Set the human-readable description.
    #[must_use]
    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    /// Set the range key field name.
    #[must_use]
    pub fn range_key(mut self, field: impl Into<String>) -> Self {
        self.range_key = Some(field.into());
        self
    }

    /// Set the schema version (non-negative, increases across deployments).
    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable optimistic locking for this table.
    #[must_use]
    pub fn optimistic_locking(mut self, enabled: bool) -> Self {
        self.optimistic_locking = enabled;
        self
    }

    /// Enable or disable read-time migrations (enabled by default).
    #[must_use]
    pub fn enable_migrations(mut self, enabled: bool) -> Self {
        self.enable_migrations = enabled;
        self
    }

    /// Override the schema-version attribute name.
    #[must_use]
    pub fn schema_version_attr(mut self, attr: impl Into<String>) -> Self {
        self.schema_version_attr = attr.into();
        self
    }

    /// Override the revision attribute name.
    #[must_use]
    pub fn revision_attr(mut self, attr: impl Into<String>) -> Self {
        self.revision_attr = attr.into();
        self
    }

    /// Declare the type tree (root type plus nested types).
    #[must_use]
    pub fn types(mut self, types: Vec<TypeDefinition>) -> Self {
        self.types = types;
        self
    }

    /// Add a global secondary index.
    #[must_use]
    pub fn global_index(mut self, index: IndexDefinition) -> Self {
        self.global_indexes.push(index);
        self
    }

    /// Add a local secondary index.
    #[must_use]
    pub fn local_index(mut self, index: IndexDefinition) -> Self {
        self.local_indexes.push(index);
        self
    }

    /// Validate and build the schema.
    pub fn build(self) -> Result<TableSchema, SchemaError> {
        let mut schema = TableSchema {
            table_name: self.table_name,
            description: self.description,
            root_type: self.root_type,
            hash_key: self.hash_key,
            range_key: self.range_key,
            version: self.version,
            optimistic_locking: self.optimistic_locking,
            enable_migrations: self.enable_migrations,
            schema_version_attr: self.schema_version_attr,
            revision_attr: self.revision_attr,
            global_indexes: self.global_indexes,
            local_indexes: self.local_indexes,
            types: self.types,
            keyed_list_paths: Vec::new(),
            compressed_paths: Vec::new(),
        };
        schema.validate()?;
        schema.keyed_list_paths = schema.build_keyed_list_paths();
        schema.compressed_paths = schema.build_compressed_paths();
        Ok(schema)
    }
}

impl TableSchema {
    /// Start building a schema for `table_name` with the given root type and
    /// hash key field.
    pub fn builder(
        table_name: impl Into<String>,
        root_type: impl Into<String>,
        hash_key: impl Into<String>,
    ) -> TableSchemaBuilder {
        TableSchemaBuilder {
            table_name: table_name.into(),
            description: None,
            root_type: root_type.into(),
            hash_key: hash_key.into(),
            range_key: None,
            version: 0,
            optimistic_locking: false,
            enable_migrations: true,
            schema_version_attr: String::from(DEFAULT_SCHEMA_VERSION_ATTR),
            revision_attr: String::from(DEFAULT_REVISION_ATTR),
            global_indexes: Vec::new(),
            local_indexes: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Logical table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Physical table name: optional global prefix + logical name +
    /// optional per-call suffix. Identical schemas can be sharded across
    /// physically distinct tables this way.
    #[must_use]
    pub fn physical_table_name(&self, prefix: Option<&str>, suffix: Option<&str>) -> String {
        let mut name = String::new();
        if let Some(p) = prefix {
            name.push_str(p);
        }
        name.push_str(&self.table_name);
        if let Some(s) = suffix {
            name.push_str(s);
        }
        name
    }

    /// Human-readable description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Logical name of the hash key field.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Logical name of the range key field, if any.
    #[must_use]
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Current code-level schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether optimistic locking is enabled for records of this table.
    #[must_use]
    pub fn optimistic_locking(&self) -> bool {
        self.optimistic_locking
    }

    /// Whether read-time migrations are enabled.
    #[must_use]
    pub fn migrations_enabled(&self) -> bool {
        self.enable_migrations
    }

    /// Storage name of the stamped schema-version attribute.
    #[must_use]
    pub fn schema_version_attr(&self) -> &str {
        &self.schema_version_attr
    }

    /// Storage name of the revision attribute.
    #[must_use]
    pub fn revision_attr(&self) -> &str {
        &self.revision_attr
    }

    /// Global secondary indexes.
    #[must_use]
    pub fn global_indexes(&self) -> &[IndexDefinition] {
        &self.global_indexes
    }

    /// Local secondary indexes.
    #[must_use]
    pub fn local_indexes(&self) -> &[IndexDefinition] {
        &self.local_indexes
    }

    /// Find an index (global or local) by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.global_indexes
            .iter()
            .chain(self.local_indexes.iter())
            .find(|i| i.name == name)
    }

    /// All declared types.
    #[must_use]
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// The root record type.
    ///
    /// # Panics
    ///
    /// The root type is guaranteed present after `build()`; a panic here
    /// means the schema was constructed without validation.
    #[must_use]
    pub fn root_type(&self) -> &TypeDefinition {
        self.type_def(&self.root_type)
    }

    /// Resolve a declared type by name.
    ///
    /// # Panics
    ///
    /// Panics if the type does not exist. Asking for an undeclared type is a
    /// programming error, not a recoverable condition.
    #[must_use]
    pub fn type_def(&self, name: &str) -> &TypeDefinition {
        self.types
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| {
                panic!("table {}: no such type `{name}`", self.table_name)
            })
    }

    /// Resolve a root-type field by logical name.
    ///
    /// # Panics
    ///
    /// Panics if the field does not exist (programming error).
    #[must_use]
    pub fn field(&self, name: &str) -> &FieldDefinition {
        self.root_type().field(name).unwrap_or_else(|| {
            panic!(
                "table {}: type {} has no field `{name}`",
                self.table_name, self.root_type
            )
        })
    }

    /// The TTL field, if one is declared.
    #[must_use]
    pub fn ttl_field(&self) -> Option<&FieldDefinition> {
        self.types
            .iter()
            .flat_map(|t| t.fields.iter())
            .find(|f| f.ttl)
    }

    /// Storage paths of list fields persisted as id-keyed maps.
    #[must_use]
    pub fn keyed_list_paths(&self) -> &[KeyedListPath] {
        &self.keyed_list_paths
    }

    /// Storage paths of collections persisted compressed.
    #[must_use]
    pub fn compressed_paths(&self) -> &[CompressedPath] {
        &self.compressed_paths
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let table = &self.table_name;
        let type_names: BTreeSet<&str> = self.types.iter().map(|t| t.name.as_str()).collect();
        if type_names.len() != self.types.len() {
            let mut seen = BTreeSet::new();
            for t in &self.types {
                if !seen.insert(t.name.as_str()) {
                    return Err(SchemaError::DuplicateTypeName {
                        table: table.clone(),
                        type_name: t.name.clone(),
                    });
                }
            }
        }

        let root = self.types.iter().find(|t| t.name == self.root_type).ok_or(
            SchemaError::UnknownRootType {
                table: table.clone(),
                root: self.root_type.clone(),
            },
        )?;

        for key in core::iter::once(&self.hash_key).chain(self.range_key.iter()) {
            if root.field(key).is_none() {
                return Err(SchemaError::UnknownKeyField {
                    table: table.clone(),
                    field: key.clone(),
                });
            }
        }

        for index in self.global_indexes.iter().chain(self.local_indexes.iter()) {
            for key in core::iter::once(&index.hash_key).chain(index.range_key.iter()) {
                if root.field(key).is_none() {
                    return Err(SchemaError::UnknownIndexField {
                        table: table.clone(),
                        index: index.name.clone(),
                        field: key.clone(),
                    });
                }
            }
        }

        let ttl_count = self
            .types
            .iter()
            .flat_map(|t| t.fields.iter())
            .filter(|f| f.ttl)
            .count();
        if ttl_count > 1 {
            return Err(SchemaError::MultipleTtlFields {
                table: table.clone(),
                count: ttl_count,
            });
        }

        for t in &self.types {
            let mut names = BTreeSet::new();
            let mut storages = BTreeSet::new();
            for field in &t.fields {
                if !names.insert(field.name.as_str()) || !storages.insert(field.storage.as_str()) {
                    return Err(SchemaError::DuplicateFieldName {
                        table: table.clone(),
                        type_name: t.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if let Some(obj) = field.kind.object_type() {
                    if !type_names.contains(obj) {
                        return Err(SchemaError::UnknownFieldType {
                            table: table.clone(),
                            type_name: t.name.clone(),
                            field: field.name.clone(),
                            referenced: String::from(obj),
                        });
                    }
                }
            }

            if let Some(equals) = &t.equals_fields {
                for name in equals {
                    if t.field(name).is_none() {
                        return Err(SchemaError::UnknownEqualsField {
                            table: table.clone(),
                            type_name: t.name.clone(),
                            field: name.clone(),
                        });
                    }
                }
            }
            if let Some(hash) = &t.hash_code_fields {
                for name in hash {
                    if t.field(name).is_none() {
                        return Err(SchemaError::UnknownHashCodeField {
                            table: table.clone(),
                            type_name: t.name.clone(),
                            field: name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    // One-level walk: the root type's own flagged fields, then the flagged
    // fields of each directly embedded type, prefixed by the embedding
    // field's storage name. The schema does not support deeper nesting of
    // these encodings.
    fn build_keyed_list_paths(&self) -> Vec<KeyedListPath> {
        let root = self.root_type();
        let mut paths = Vec::new();
        collect_keyed(root, None, &mut paths);
        for field in &root.fields {
            if let Some(obj) = field.kind.object_type() {
                collect_keyed(self.type_def(obj), Some(&field.storage), &mut paths);
            }
        }
        paths
    }

    fn build_compressed_paths(&self) -> Vec<CompressedPath> {
        let root = self.root_type();
        let mut paths = Vec::new();
        collect_compressed(root, None, &mut paths);
        for field in &root.fields {
            if let Some(obj) = field.kind.object_type() {
                collect_compressed(self.type_def(obj), Some(&field.storage), &mut paths);
            }
        }
        paths
    }
}

fn collect_keyed(t: &TypeDefinition, parent: Option<&str>, out: &mut Vec<KeyedListPath>) {
    for field in &t.fields {
        if let Some(id_attr) = &field.keyed_by {
            out.push(KeyedListPath {
                parent: parent.map(String::from),
                attr: field.storage.clone(),
                id_attr: id_attr.clone(),
            });
        }
    }
}

fn collect_compressed(t: &TypeDefinition, parent: Option<&str>, out: &mut Vec<CompressedPath>) {
    for field in &t.fields {
        if field.compress {
            out.push(CompressedPath {
                parent: parent.map(String::from),
                attr: field.storage.clone(),
            });
        }
    }
}

/// Process-wide, read-only set of table schemas.
///
/// Loaded once at startup and shared by handle; safe to share across
/// threads since nothing mutates after construction.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, Arc<TableSchema>>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validated schema under its table name.
    pub fn register(&mut self, schema: TableSchema) {
        self.tables
            .insert(String::from(schema.table_name()), Arc::new(schema));
    }

    /// Look up a schema by logical table name.
    #[must_use]
    pub fn get(&self, table_name: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(table_name).cloned()
    }

    /// Registered table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn player_types() -> Vec<TypeDefinition> {
        vec![
            TypeDefinition::new(
                "Player",
                vec![
                    FieldDefinition::new("player_id", FieldKind::String).stored_as("id"),
                    FieldDefinition::new("sequence", FieldKind::Number).stored_as("seq"),
                    FieldDefinition::new("alias", FieldKind::String),
                    FieldDefinition::new("stats", FieldKind::Object(String::from("Stats")))
                        .stored_as("st"),
                    FieldDefinition::new(
                        "inventory",
                        FieldKind::List(Box::new(FieldKind::Object(String::from(
                            "Item",
                        )))),
                    )
                    .stored_as("inv")
                    .keyed_by("id"),
                ],
            ),
            TypeDefinition::new(
                "Stats",
                vec![
                    FieldDefinition::new("bio", FieldKind::String),
                    FieldDefinition::new(
                        "history",
                        FieldKind::List(Box::new(FieldKind::String)),
                    )
                    .stored_as("hist")
                    .compressed(),
                ],
            ),
            TypeDefinition::new(
                "Item",
                vec![
                    FieldDefinition::new("id", FieldKind::String),
                    FieldDefinition::new("count", FieldKind::Number),
                ],
            ),
        ]
    }

    fn player_schema() -> TableSchema {
        TableSchema::builder("players", "Player", "player_id")
            .range_key("sequence")
            .version(1)
            .optimistic_locking(true)
            .types(player_types())
            .global_index(IndexDefinition {
                name: String::from("alias_index"),
                hash_key: String::from("alias"),
                range_key: Some(String::from("sequence")),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn builds_and_resolves_fields() {
        let schema = player_schema();
        assert_eq!(schema.field("alias").storage, "alias");
        assert_eq!(schema.field("player_id").storage, "id");
        assert_eq!(schema.type_def("Stats").fields.len(), 2);
        assert_eq!(schema.version(), 1);
        assert!(schema.optimistic_locking());
        assert_eq!(schema.schema_version_attr(), DEFAULT_SCHEMA_VERSION_ATTR);
    }

    #[test]
    #[should_panic(expected = "no field")]
    fn unknown_field_panics() {
        player_schema().field("nope");
    }

    #[test]
    fn physical_table_name_composes() {
        let schema = player_schema();
        assert_eq!(schema.physical_table_name(None, None), "players");
        assert_eq!(
            schema.physical_table_name(Some("test-"), Some("-7")),
            "test-players-7"
        );
    }

    #[test]
    fn keyed_list_paths_cover_root_and_nested() {
        let schema = player_schema();
        assert_eq!(
            schema.keyed_list_paths(),
            &[KeyedListPath {
                parent: None,
                attr: String::from("inv"),
                id_attr: String::from("id"),
            }]
        );
        assert_eq!(
            schema.compressed_paths(),
            &[CompressedPath {
                parent: Some(String::from("st")),
                attr: String::from("hist"),
            }]
        );
    }

    #[test]
    fn rejects_two_ttl_fields() {
        let mut types = player_types();
        types[0].fields[1] = FieldDefinition::new("sequence", FieldKind::Number)
            .stored_as("seq")
            .ttl();
        types[1].fields[0] = FieldDefinition::new("bio", FieldKind::String).ttl();
        let err = TableSchema::builder("players", "Player", "player_id")
            .range_key("sequence")
            .types(types)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MultipleTtlFields {
                table: String::from("players"),
                count: 2
            }
        );
    }

    #[test]
    fn rejects_invalid_equals_fields() {
        let mut types = player_types();
        types[2].equals_fields = Some(vec![String::from("id"), String::from("missing")]);
        let err = TableSchema::builder("players", "Player", "player_id")
            .range_key("sequence")
            .types(types)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownEqualsField { field, .. } if field == "missing"));
    }

    #[test]
    fn rejects_unknown_key_field() {
        let err = TableSchema::builder("players", "Player", "missing")
            .types(player_types())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKeyField { field, .. } if field == "missing"));
    }

    #[test]
    fn rejects_unknown_index_field() {
        let err = TableSchema::builder("players", "Player", "player_id")
            .range_key("sequence")
            .types(player_types())
            .global_index(IndexDefinition {
                name: String::from("bad"),
                hash_key: String::from("missing"),
                range_key: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownIndexField { .. }));
    }

    #[test]
    fn rejects_unknown_nested_type() {
        let types = vec![TypeDefinition::new(
            "Player",
            vec![
                FieldDefinition::new("player_id", FieldKind::String),
                FieldDefinition::new("stats", FieldKind::Object(String::from("Ghost"))),
            ],
        )];
        let err = TableSchema::builder("players", "Player", "player_id")
            .types(types)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownFieldType { referenced, .. } if referenced == "Ghost"));
    }

    #[test]
    fn registry_lookup() {
        let mut registry = SchemaRegistry::new();
        registry.register(player_schema());
        assert!(registry.get("players").is_some());
        assert!(registry.get("ghosts").is_none());
        assert_eq!(registry.table_names().collect::<Vec<_>>(), vec!["players"]);
    }
}
