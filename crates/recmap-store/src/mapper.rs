//! High-level record access over an [`ItemStore`] backend.
//!
//! `RecordMapper` wraps a backend with the schema registry, read-time
//! migrations, optimistic locking, structural field encodings, table naming
//! (prefix + logical name + suffix), rate gating, and batch chunking. Each
//! operation maps to exactly one store round trip (or one chunked sequence
//! of round trips for batches); there is no cache and no internal retry —
//! after a conflict, the caller reloads and reconstructs the write.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use recmap::{
    AttrValue, ConditionExpression, RawItem, Record, RecordError, RecordKey, RecordUpdate,
    SaveLock, SchemaRegistry, TableSchema,
};
use recmap_migrate::{Migration, MigrationError, MigrationRegistry};

use crate::codec::{self, CodecError};
use crate::limiter::ReadWriteGates;
use crate::requests::{
    BatchGetResult, BatchWriteResult, DeleteRequest, GetRequest, QueryRequest, SaveParams,
    ScanRequest,
};
use crate::traits::{
    ItemKey, ItemStore, KeyCondition, WriteOutcome, MAX_BATCH_GET, MAX_BATCH_WRITE,
};

/// Error type for mapper operations.
///
/// Conflicts are ordinary, recoverable outcomes a caller branches on —
/// reload the record and rebuild the write. Store throttling and transport
/// errors pass through as [`MapperError::Store`] unchanged.
#[derive(Debug)]
pub enum MapperError<E: fmt::Debug + fmt::Display> {
    /// Error from the underlying store backend.
    Store(E),
    /// The revision precondition failed: someone else wrote first.
    ConcurrencyConflict,
    /// The key-must-not-exist precondition failed.
    OverwriteConflict,
    /// A caller-declared condition evaluated false.
    ConditionFailed,
    /// Read-time migration failed.
    Migration(MigrationError),
    /// Structural encode/decode failed.
    Codec(CodecError),
    /// Typed record conversion failed.
    Record(RecordError),
    /// No schema registered for the record's table.
    UnknownTable(String),
    /// The query names an index the schema does not declare.
    UnknownIndex {
        /// Table queried.
        table: String,
        /// Index name that did not resolve.
        index: String,
    },
    /// The query constrains a range key the key layout does not have.
    MissingRangeKey {
        /// Table queried.
        table: String,
    },
}

impl<E: fmt::Debug + fmt::Display> fmt::Display for MapperError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::ConcurrencyConflict => {
                write!(f, "optimistic lock conflict: stored revision changed")
            }
            Self::OverwriteConflict => write!(f, "overwrite conflict: item already exists"),
            Self::ConditionFailed => write!(f, "conditional check failed"),
            Self::Migration(e) => write!(f, "migration error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Record(e) => write!(f, "record error: {e}"),
            Self::UnknownTable(table) => {
                write!(f, "no schema registered for table `{table}`")
            }
            Self::UnknownIndex { table, index } => {
                write!(f, "table `{table}` has no index `{index}`")
            }
            Self::MissingRangeKey { table } => {
                write!(f, "table `{table}`: key layout has no range key to constrain")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for MapperError<E> {}

/// High-level record access combining a store backend with the schema
/// registry, migrations, and locking.
///
/// # Example
///
/// ```no_run
/// use recmap::SchemaRegistry;
/// use recmap_store::{MemoryStore, RecordMapper};
///
/// let registry = SchemaRegistry::new(); // usually recmap_schema::load_registry(...)
/// let mapper = RecordMapper::new(MemoryStore::new(), registry);
/// # let _ = mapper;
/// ```
pub struct RecordMapper<S: ItemStore> {
    store: S,
    registry: SchemaRegistry,
    migrations: MigrationRegistry,
    prefix: Option<String>,
    gates: ReadWriteGates,
}

/// Builder for a [`RecordMapper`] with prefix, gates, and migrations.
pub struct RecordMapperBuilder<S: ItemStore> {
    store: S,
    registry: SchemaRegistry,
    migrations: MigrationRegistry,
    prefix: Option<String>,
    gates: ReadWriteGates,
}

impl<S: ItemStore> RecordMapperBuilder<S> {
    /// Prepend a global prefix to every physical table name.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Configure the read/write rate gates.
    #[must_use]
    pub fn gates(mut self, gates: ReadWriteGates) -> Self {
        self.gates = gates;
        self
    }

    /// Register a migration step for a record type.
    #[must_use]
    pub fn register_migration(
        mut self,
        record_type: impl Into<String>,
        step: Box<dyn Migration>,
    ) -> Self {
        self.migrations.register(record_type, step);
        self
    }

    /// Build the mapper.
    #[must_use]
    pub fn build(self) -> RecordMapper<S> {
        RecordMapper {
            store: self.store,
            registry: self.registry,
            migrations: self.migrations,
            prefix: self.prefix,
            gates: self.gates,
        }
    }
}

impl<S: ItemStore> RecordMapper<S> {
    /// Wrap a store with default configuration (no prefix, no gates, no
    /// migrations).
    #[must_use]
    pub fn new(store: S, registry: SchemaRegistry) -> Self {
        Self::builder(store, registry).build()
    }

    /// Start building a mapper.
    #[must_use]
    pub fn builder(store: S, registry: SchemaRegistry) -> RecordMapperBuilder<S> {
        RecordMapperBuilder {
            store,
            registry,
            migrations: MigrationRegistry::new(),
            prefix: None,
            gates: ReadWriteGates::default(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Take the store back, e.g. to rebuild a mapper against a newer
    /// schema registry over the same data.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// The schema registry.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Look up the schema for a table, for building [`RecordUpdate`]s.
    #[must_use]
    pub fn schema_for(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.registry.get(table)
    }

    fn schema<R: Record>(&self) -> Result<Arc<TableSchema>, MapperError<S::Error>> {
        self.registry
            .get(R::table_name())
            .ok_or_else(|| MapperError::UnknownTable(R::table_name().to_string()))
    }

    fn table_name(&self, schema: &TableSchema, suffix: Option<&str>) -> String {
        schema.physical_table_name(self.prefix.as_deref(), suffix)
    }

    fn decode<R: Record>(
        &self,
        schema: &TableSchema,
        mut item: RawItem,
    ) -> Result<R, MapperError<S::Error>> {
        self.migrations
            .run_to_current(schema, &mut item)
            .map_err(MapperError::Migration)?;
        codec::decode_item(schema, &mut item).map_err(MapperError::Codec)?;
        let mut record = R::from_item(&item).map_err(MapperError::Record)?;
        if let Some(rev) = item.get(schema.revision_attr()).and_then(AttrValue::as_i64) {
            record.set_revision(rev.max(0) as u64);
        }
        Ok(record)
    }

    fn encode<R: Record>(
        schema: &TableSchema,
        record: &R,
    ) -> Result<RawItem, MapperError<S::Error>> {
        let mut item = record.to_item();
        codec::encode_item(schema, &mut item).map_err(MapperError::Codec)?;
        item.insert(
            schema.schema_version_attr().to_string(),
            AttrValue::from(i64::from(schema.version())),
        );
        Ok(item)
    }

    fn item_key(schema: &TableSchema, key: &RecordKey) -> ItemKey {
        let hash_attr = schema.field(schema.hash_key()).storage.clone();
        let mut item_key = ItemKey::new(hash_attr, key.hash.clone());
        if let (Some(range_field), Some(range_value)) = (schema.range_key(), key.range.clone()) {
            item_key = item_key.with_range(schema.field(range_field).storage.clone(), range_value);
        }
        item_key
    }

    /// Write a full record, replacing any stored one, through the
    /// optimistic-locking controller.
    ///
    /// The item is stamped with the table's current schema version and, when
    /// locking is enabled, the incremented revision.
    pub fn save<R: Record>(
        &mut self,
        record: &R,
        params: &SaveParams,
    ) -> Result<(), MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let mut item = Self::encode(&schema, record)?;
        let lock = SaveLock::for_save(
            &schema,
            record.revision(),
            params.overwrite_disabled(),
            params.locking_disabled(),
        );
        if let Some(revision) = lock.stamped_revision() {
            item.insert(schema.revision_attr().to_string(), AttrValue::from(revision));
        }
        let condition = ConditionExpression::from_conditions(&lock.conditions(&schema));
        let key = Self::item_key(&schema, &record.key());
        let table = self.table_name(&schema, params.suffix());

        self.gates.acquire_write(1);
        match self
            .store
            .put_item(&table, &key, item, &condition)
            .map_err(MapperError::Store)?
        {
            WriteOutcome::Applied(_) => Ok(()),
            WriteOutcome::ConditionFailed if lock.overwrite_guarded() => {
                Err(MapperError::OverwriteConflict)
            }
            WriteOutcome::ConditionFailed if lock.revision_guarded() => {
                Err(MapperError::ConcurrencyConflict)
            }
            WriteOutcome::ConditionFailed => Err(MapperError::ConditionFailed),
        }
    }

    /// Apply one compiled delta atomically and return the record as stored
    /// afterwards.
    ///
    /// The update is consumed: a conflict means the caller reloads the
    /// record and builds a fresh one.
    pub fn update<R: Record>(
        &mut self,
        update: RecordUpdate,
    ) -> Result<R, MapperError<S::Error>> {
        let schema = update.schema().clone();
        if schema.table_name() != R::table_name() {
            return Err(MapperError::UnknownTable(R::table_name().to_string()));
        }
        let expression = update.compile();
        let key = Self::item_key(&schema, update.key());
        let table = self.table_name(&schema, update.suffix());

        self.gates.acquire_write(1);
        match self
            .store
            .update_item(&table, &key, &expression)
            .map_err(MapperError::Store)?
        {
            WriteOutcome::Applied(item) => self.decode(&schema, item),
            WriteOutcome::ConditionFailed if update.revision_guarded() => {
                Err(MapperError::ConcurrencyConflict)
            }
            WriteOutcome::ConditionFailed => Err(MapperError::ConditionFailed),
        }
    }

    /// Fetch one record by key. Absence is `Ok(None)`, never an error.
    ///
    /// The raw item passes through the migration engine before decoding, so
    /// callers always see the current shape; the stored item keeps its old
    /// stamped version until re-saved.
    pub fn get<R: Record>(
        &self,
        request: &GetRequest,
    ) -> Result<Option<R>, MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let key = Self::item_key(&schema, &request.key);
        let table = self.table_name(&schema, request.suffix.as_deref());

        self.gates.acquire_read(1);
        match self
            .store
            .get_item(&table, &key, request.consistent_read)
            .map_err(MapperError::Store)?
        {
            None => Ok(None),
            Some(item) => Ok(Some(self.decode(&schema, item)?)),
        }
    }

    /// Delete one record by key.
    pub fn delete<R: Record>(
        &mut self,
        request: &DeleteRequest,
    ) -> Result<(), MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let key = Self::item_key(&schema, &request.key);
        let table = self.table_name(&schema, request.suffix.as_deref());
        self.gates.acquire_write(1);
        self.store
            .delete_item(&table, &key)
            .map_err(MapperError::Store)
    }

    /// Query by key condition, through the primary key layout or a named
    /// GSI/LSI.
    pub fn query<R: Record>(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<R>, MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let (hash_field, range_field) = match &request.index {
            None => (
                schema.hash_key().to_string(),
                schema.range_key().map(String::from),
            ),
            Some(name) => {
                let index = schema.index(name).ok_or_else(|| MapperError::UnknownIndex {
                    table: schema.table_name().to_string(),
                    index: name.clone(),
                })?;
                (index.hash_key.clone(), index.range_key.clone())
            }
        };

        let range = match (&request.range, &range_field) {
            (None, _) => None,
            (Some(condition), Some(field)) => {
                Some((schema.field(field).storage.clone(), condition.clone()))
            }
            (Some(_), None) => {
                return Err(MapperError::MissingRangeKey {
                    table: schema.table_name().to_string(),
                })
            }
        };

        let condition = KeyCondition {
            hash: (
                schema.field(&hash_field).storage.clone(),
                request.hash_value.clone(),
            ),
            range,
        };
        let table = self.table_name(&schema, request.suffix.as_deref());

        self.gates.acquire_read(1);
        let items = self
            .store
            .query(&table, &condition)
            .map_err(MapperError::Store)?;
        items
            .into_iter()
            .map(|item| self.decode(&schema, item))
            .collect()
    }

    /// Scan the whole table.
    pub fn scan<R: Record>(
        &self,
        request: &ScanRequest,
    ) -> Result<Vec<R>, MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let table = self.table_name(&schema, request.suffix.as_deref());
        self.gates.acquire_read(1);
        let items = self.store.scan(&table).map_err(MapperError::Store)?;
        items
            .into_iter()
            .map(|item| self.decode(&schema, item))
            .collect()
    }

    /// Fetch many records, chunked at the store's batch-get limit, with the
    /// read gate consulted once per chunk. Requests may target different
    /// suffixed shards; unprocessed keys come back for the caller to retry.
    pub fn batch_get<R: Record>(
        &self,
        requests: &[GetRequest],
    ) -> Result<BatchGetResult<R>, MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let mut groups: BTreeMap<Option<String>, Vec<ItemKey>> = BTreeMap::new();
        for request in requests {
            groups
                .entry(request.suffix.clone())
                .or_default()
                .push(Self::item_key(&schema, &request.key));
        }

        let mut records = Vec::new();
        let mut unprocessed = Vec::new();
        for (suffix, keys) in groups {
            let table = self.table_name(&schema, suffix.as_deref());
            for chunk in keys.chunks(MAX_BATCH_GET) {
                self.gates.acquire_read(chunk.len() as u32);
                let output = self
                    .store
                    .batch_get_items(&table, chunk)
                    .map_err(MapperError::Store)?;
                for item in output.items {
                    records.push(self.decode(&schema, item)?);
                }
                unprocessed.extend(output.unprocessed.into_iter().map(record_key_of));
            }
        }
        Ok(BatchGetResult {
            records,
            unprocessed,
        })
    }

    /// Write many records unconditionally, chunked at the store's
    /// batch-write limit, with the write gate consulted once per chunk.
    /// Per-item failures surface as unprocessed keys, never a whole-batch
    /// failure.
    pub fn batch_save<R: Record>(
        &mut self,
        records: &[R],
        suffix: Option<&str>,
    ) -> Result<BatchWriteResult, MapperError<S::Error>> {
        let schema = self.schema::<R>()?;
        let table = self.table_name(&schema, suffix);

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let mut item = Self::encode(&schema, record)?;
            if schema.optimistic_locking() {
                let revision = record.revision().unwrap_or(0) + 1;
                item.insert(schema.revision_attr().to_string(), AttrValue::from(revision));
            }
            items.push((Self::item_key(&schema, &record.key()), item));
        }

        let mut result = BatchWriteResult::default();
        for chunk in items.chunks(MAX_BATCH_WRITE) {
            self.gates.acquire_write(chunk.len() as u32);
            let unprocessed = self
                .store
                .batch_write_items(&table, chunk.to_vec())
                .map_err(MapperError::Store)?;
            result.written += chunk.len() - unprocessed.len();
            result.unprocessed
                .extend(unprocessed.into_iter().map(record_key_of));
        }
        Ok(result)
    }
}

fn record_key_of(key: ItemKey) -> RecordKey {
    RecordKey {
        hash: key.hash.1,
        range: key.range.map(|(_, value)| value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use recmap::{
        required_i64, required_str, FieldDefinition, FieldKind, TypeDefinition,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: String,
        name: String,
        weight: i64,
        revision: Option<u64>,
    }

    impl Doc {
        fn new(id: &str, name: &str, weight: i64) -> Self {
            Self {
                id: id.to_string(),
                name: name.to_string(),
                weight,
                revision: None,
            }
        }
    }

    impl Record for Doc {
        fn table_name() -> &'static str {
            "docs"
        }
        fn key(&self) -> RecordKey {
            RecordKey::hash(self.id.as_str())
        }
        fn revision(&self) -> Option<u64> {
            self.revision
        }
        fn set_revision(&mut self, revision: u64) {
            self.revision = Some(revision);
        }
        fn to_item(&self) -> RawItem {
            let mut item = RawItem::new();
            item.insert("id".to_string(), AttrValue::from(self.id.as_str()));
            item.insert("name".to_string(), AttrValue::from(self.name.as_str()));
            item.insert("weight".to_string(), AttrValue::from(self.weight));
            item
        }
        fn from_item(item: &RawItem) -> Result<Self, RecordError> {
            Ok(Self {
                id: required_str(item, "id")?.to_string(),
                name: required_str(item, "name")?.to_string(),
                weight: required_i64(item, "weight")?,
                revision: None,
            })
        }
    }

    fn registry() -> SchemaRegistry {
        let schema = TableSchema::builder("docs", "Doc", "id")
            .version(1)
            .optimistic_locking(true)
            .types(vec![TypeDefinition::new(
                "Doc",
                vec![
                    FieldDefinition::new("id", FieldKind::String),
                    FieldDefinition::new("name", FieldKind::String),
                    FieldDefinition::new("weight", FieldKind::Number),
                ],
            )])
            .build()
            .unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register(schema);
        registry
    }

    fn mapper() -> RecordMapper<MemoryStore> {
        RecordMapper::new(MemoryStore::new(), registry())
    }

    #[test]
    fn save_get_roundtrip_sets_revision() {
        let mut mapper = mapper();
        mapper
            .save(&Doc::new("1", "test", 6), &SaveParams::new())
            .unwrap();

        let loaded: Doc = mapper
            .get(&GetRequest::new(RecordKey::hash("1")))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "test");
        assert_eq!(loaded.revision, Some(1));
    }

    #[test]
    fn get_absent_is_none() {
        let mapper = mapper();
        let loaded: Option<Doc> = mapper.get(&GetRequest::new(RecordKey::hash("nope"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn stale_save_conflicts() {
        let mut mapper = mapper();
        mapper
            .save(&Doc::new("1", "test", 6), &SaveParams::new())
            .unwrap();
        let loaded: Doc = mapper
            .get(&GetRequest::new(RecordKey::hash("1")))
            .unwrap()
            .unwrap();

        mapper.save(&loaded, &SaveParams::new()).unwrap();
        let err = mapper.save(&loaded, &SaveParams::new()).unwrap_err();
        assert!(matches!(err, MapperError::ConcurrencyConflict));
    }

    #[test]
    fn disable_overwrite_conflicts_on_existing_key() {
        let mut mapper = mapper();
        let doc = Doc::new("1", "test", 6);
        mapper.save(&doc, &SaveParams::new()).unwrap();
        let err = mapper
            .save(&doc, &SaveParams::new().disable_overwrite())
            .unwrap_err();
        assert!(matches!(err, MapperError::OverwriteConflict));
    }

    #[test]
    fn unknown_table_is_reported() {
        let mapper = RecordMapper::new(MemoryStore::new(), SchemaRegistry::new());
        let err = mapper
            .get::<Doc>(&GetRequest::new(RecordKey::hash("1")))
            .unwrap_err();
        assert!(matches!(err, MapperError::UnknownTable(t) if t == "docs"));
    }

    #[test]
    fn update_returns_stored_record() {
        let mut mapper = mapper();
        mapper
            .save(&Doc::new("1", "test", 6), &SaveParams::new())
            .unwrap();
        let loaded: Doc = mapper
            .get(&GetRequest::new(RecordKey::hash("1")))
            .unwrap()
            .unwrap();

        let schema = mapper.schema_for("docs").unwrap();
        let mut update = RecordUpdate::for_record(schema, &loaded);
        update.set_field("weight", 100i64);
        let updated: Doc = mapper.update(update).unwrap();
        assert_eq!(updated.weight, 100);
        assert_eq!(updated.revision, Some(2));
    }

    #[test]
    fn prefix_separates_physical_tables() {
        let mut mapper = RecordMapper::builder(MemoryStore::new(), registry())
            .prefix("test-")
            .build();
        mapper
            .save(&Doc::new("1", "test", 6), &SaveParams::new())
            .unwrap();
        assert_eq!(
            mapper.store().table_names().collect::<Vec<_>>(),
            vec!["test-docs"]
        );
    }
}
