use recmap::{AttrValue, RecordKey};

use crate::traits::RangeCondition;

/// Per-call parameters for a full save.
///
/// # Example
///
/// ```
/// use recmap_store::SaveParams;
///
/// let params = SaveParams::new().disable_overwrite().with_suffix("-3");
/// assert!(params.overwrite_disabled());
/// assert_eq!(params.suffix(), Some("-3"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SaveParams {
    disable_overwrite: bool,
    disable_optimistic_locking: bool,
    suffix: Option<String>,
}

impl SaveParams {
    /// Defaults: overwrite allowed, optimistic locking as the schema says,
    /// no table suffix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the target key to not exist yet.
    #[must_use]
    pub fn disable_overwrite(mut self) -> Self {
        self.disable_overwrite = true;
        self
    }

    /// Drop the revision precondition for this save only.
    #[must_use]
    pub fn disable_optimistic_locking(mut self) -> Self {
        self.disable_optimistic_locking = true;
        self
    }

    /// Route the save to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Whether the key must not exist yet.
    #[must_use]
    pub fn overwrite_disabled(&self) -> bool {
        self.disable_overwrite
    }

    /// Whether the revision precondition is dropped for this save.
    #[must_use]
    pub fn locking_disabled(&self) -> bool {
        self.disable_optimistic_locking
    }

    /// The table suffix, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

/// Parameters for fetching one record by key.
#[derive(Debug, Clone)]
pub struct GetRequest {
    /// The record's primary key.
    pub key: RecordKey,
    /// Table suffix, if the record lives in a suffixed shard.
    pub suffix: Option<String>,
    /// Request a strongly consistent read.
    pub consistent_read: bool,
}

impl GetRequest {
    /// Fetch by key with defaults (no suffix, eventually consistent).
    #[must_use]
    pub fn new(key: RecordKey) -> Self {
        Self {
            key,
            suffix: None,
            consistent_read: false,
        }
    }

    /// Route to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Request a strongly consistent read.
    #[must_use]
    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }
}

/// Parameters for deleting one record by key.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// The record's primary key.
    pub key: RecordKey,
    /// Table suffix, if the record lives in a suffixed shard.
    pub suffix: Option<String>,
}

impl DeleteRequest {
    /// Delete by key.
    #[must_use]
    pub fn new(key: RecordKey) -> Self {
        Self { key, suffix: None }
    }

    /// Route to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Parameters for a key-condition query, optionally through a secondary
/// index.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Required hash key value (of the table, or of the chosen index).
    pub hash_value: AttrValue,
    /// Optional condition on the range key.
    pub range: Option<RangeCondition>,
    /// Name of the GSI/LSI to query, if not the primary key.
    pub index: Option<String>,
    /// Table suffix, if querying a suffixed shard.
    pub suffix: Option<String>,
}

impl QueryRequest {
    /// Query by hash key value.
    #[must_use]
    pub fn new(hash_value: impl Into<AttrValue>) -> Self {
        Self {
            hash_value: hash_value.into(),
            range: None,
            index: None,
            suffix: None,
        }
    }

    /// Constrain the range key.
    #[must_use]
    pub fn with_range(mut self, condition: RangeCondition) -> Self {
        self.range = Some(condition);
        self
    }

    /// Query through a named secondary index.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Route to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Parameters for a full-table scan.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Table suffix, if scanning a suffixed shard.
    pub suffix: Option<String>,
}

impl ScanRequest {
    /// Scan the whole table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Typed records found by a batch get, plus the keys the store left
/// unprocessed (the caller retries only those).
#[derive(Debug)]
pub struct BatchGetResult<R> {
    /// Records found, decoded and migrated.
    pub records: Vec<R>,
    /// Keys the store did not process.
    pub unprocessed: Vec<RecordKey>,
}

/// Outcome of a batch save: how many items were written and which were left
/// unprocessed. Partial failure is per-item, never whole-batch.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteResult {
    /// Number of items the store accepted.
    pub written: usize,
    /// Keys of items the store did not process.
    pub unprocessed: Vec<RecordKey>,
}
