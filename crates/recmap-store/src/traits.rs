use std::fmt;

use recmap::{AttrValue, ConditionExpression, RawItem, UpdateExpression};

/// Largest number of keys one batch-get round trip may carry.
pub const MAX_BATCH_GET: usize = 100;

/// Largest number of items one batch-write round trip may carry.
pub const MAX_BATCH_WRITE: usize = 25;

/// Fully-resolved primary key of one stored item: storage attribute names
/// paired with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemKey {
    /// Hash key attribute name and value.
    pub hash: (String, AttrValue),
    /// Range key attribute name and value, for tables that declare one.
    pub range: Option<(String, AttrValue)>,
}

impl ItemKey {
    /// Key with only a hash attribute.
    pub fn new(hash_attr: impl Into<String>, hash_value: AttrValue) -> Self {
        Self {
            hash: (hash_attr.into(), hash_value),
            range: None,
        }
    }

    /// Attach the range attribute.
    #[must_use]
    pub fn with_range(mut self, range_attr: impl Into<String>, range_value: AttrValue) -> Self {
        self.range = Some((range_attr.into(), range_value));
        self
    }
}

/// Result of a conditional write.
///
/// A failed condition is an expected outcome, not a transport error: the
/// write was rejected atomically and stored state is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write was applied; carries the item as stored afterwards.
    Applied(RawItem),
    /// A condition evaluated false; nothing was written.
    ConditionFailed,
}

/// Condition on the range key of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeCondition {
    /// Range key equals the value.
    Eq(AttrValue),
    /// Range key is less than the value.
    Lt(AttrValue),
    /// Range key is at most the value.
    Le(AttrValue),
    /// Range key is greater than the value.
    Gt(AttrValue),
    /// Range key is at least the value.
    Ge(AttrValue),
    /// Range key is within the inclusive interval.
    Between(AttrValue, AttrValue),
    /// Range key is a string starting with the prefix.
    BeginsWith(String),
}

impl RangeCondition {
    /// Evaluate against a stored range key value.
    #[must_use]
    pub fn matches(&self, actual: &AttrValue) -> bool {
        use recmap::{evaluate_comparison, ComparisonOperator as Op};
        match self {
            Self::Eq(v) => evaluate_comparison(Op::Eq, actual, v),
            Self::Lt(v) => evaluate_comparison(Op::Lt, actual, v),
            Self::Le(v) => evaluate_comparison(Op::Le, actual, v),
            Self::Gt(v) => evaluate_comparison(Op::Gt, actual, v),
            Self::Ge(v) => evaluate_comparison(Op::Ge, actual, v),
            Self::Between(lo, hi) => {
                evaluate_comparison(Op::Ge, actual, lo) && evaluate_comparison(Op::Le, actual, hi)
            }
            Self::BeginsWith(prefix) => actual
                .as_str()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
        }
    }
}

/// Key condition of one query: hash attribute equality plus an optional
/// range attribute condition. The mapper resolves index names down to
/// attribute names before reaching the store.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    /// Hash attribute name and required value.
    pub hash: (String, AttrValue),
    /// Range attribute name and condition, if constrained.
    pub range: Option<(String, RangeCondition)>,
}

/// Output of one batch-get round trip.
#[derive(Debug, Clone, Default)]
pub struct BatchGetOutput {
    /// Items found, in no particular order.
    pub items: Vec<RawItem>,
    /// Keys the store did not process; the caller retries these.
    pub unprocessed: Vec<ItemKey>,
}

/// The backing item store: a hosted key/range-keyed table service with
/// item-level atomic conditional writes and no multi-item transactions.
///
/// Every write is a self-contained atomic request; concurrent writers to
/// different keys need no coordination, and same-key writers are serialized
/// by the store's own item-level atomicity plus the caller's conditions.
/// Throttling/capacity errors surface through `Error` unchanged.
pub trait ItemStore {
    /// Error type for this backend.
    type Error: fmt::Debug + fmt::Display;

    /// Fetch one item by key. Absent items are `Ok(None)`, never an error.
    fn get_item(
        &self,
        table: &str,
        key: &ItemKey,
        consistent: bool,
    ) -> Result<Option<RawItem>, Self::Error>;

    /// Write a full item, replacing any stored one, subject to `condition`.
    fn put_item(
        &mut self,
        table: &str,
        key: &ItemKey,
        item: RawItem,
        condition: &ConditionExpression,
    ) -> Result<WriteOutcome, Self::Error>;

    /// Apply a partial update (clause collections plus conditions)
    /// atomically to one item, creating it when absent.
    fn update_item(
        &mut self,
        table: &str,
        key: &ItemKey,
        expression: &UpdateExpression,
    ) -> Result<WriteOutcome, Self::Error>;

    /// Delete one item by key. Deleting an absent item is not an error.
    fn delete_item(&mut self, table: &str, key: &ItemKey) -> Result<(), Self::Error>;

    /// Items matching a key condition, ordered by range key where present.
    fn query(&self, table: &str, condition: &KeyCondition) -> Result<Vec<RawItem>, Self::Error>;

    /// Every item in the table.
    fn scan(&self, table: &str) -> Result<Vec<RawItem>, Self::Error>;

    /// Fetch up to [`MAX_BATCH_GET`] items in one round trip. Keys the
    /// store could not process come back in `unprocessed`, never dropped.
    fn batch_get_items(
        &self,
        table: &str,
        keys: &[ItemKey],
    ) -> Result<BatchGetOutput, Self::Error>;

    /// Write up to [`MAX_BATCH_WRITE`] items unconditionally in one round
    /// trip. Returns the keys of items the store did not process.
    fn batch_write_items(
        &mut self,
        table: &str,
        items: Vec<(ItemKey, RawItem)>,
    ) -> Result<Vec<ItemKey>, Self::Error>;
}
