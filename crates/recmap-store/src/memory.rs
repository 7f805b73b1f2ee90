use std::collections::BTreeMap;
use std::fmt;

use recmap::{
    evaluate_comparison, AttrValue, ComparisonOperator, ConditionClause, ConditionExpression,
    RawItem, UpdateExpression,
};

use crate::traits::{BatchGetOutput, ItemKey, ItemStore, KeyCondition, WriteOutcome};

/// In-memory item store.
///
/// All data lives in `BTreeMap`s — nothing touches the network. The
/// conditional-write semantics of the hosted store are emulated faithfully:
/// conditions are evaluated against the stored item and a false condition
/// rejects the whole write atomically. Ideal for tests and prototyping.
///
/// # Example
///
/// ```
/// use recmap::{AttrValue, ConditionExpression, RawItem};
/// use recmap_store::{ItemKey, ItemStore, MemoryStore, WriteOutcome};
///
/// let mut store = MemoryStore::new();
/// let key = ItemKey::new("id", AttrValue::from("a"));
/// let mut item = RawItem::new();
/// item.insert("id".into(), AttrValue::from("a"));
///
/// let outcome = store
///     .put_item("docs", &key, item, &ConditionExpression::default())
///     .unwrap();
/// assert!(matches!(outcome, WriteOutcome::Applied(_)));
/// assert!(store.get_item("docs", &key, false).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// table name -> canonical key -> item
    tables: BTreeMap<String, BTreeMap<String, RawItem>>,
}

/// Error type for the in-memory backend.
///
/// Raised only for malformed expressions (type-mismatched ADD, paths
/// through non-map attributes); plain storage operations never fail.
#[derive(Debug, Clone)]
pub struct MemoryError(String);

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore error: {}", self.0)
    }
}

impl std::error::Error for MemoryError {}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across all tables.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Names of tables holding at least one item.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn canon(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => format!("s:{s}"),
        // Integers shift into unsigned space so the lexical order of the
        // canonical form matches numeric order.
        AttrValue::Num(recmap::Number::Int(n)) => {
            format!("n:{:020}", (*n as i128) - (i64::MIN as i128))
        }
        AttrValue::Num(n) => format!("f:{n}"),
        AttrValue::Bool(b) => format!("b:{b}"),
        other => format!("x:{other:?}"),
    }
}

fn canon_key(key: &ItemKey) -> String {
    let mut out = canon(&key.hash.1);
    if let Some((_, range)) = &key.range {
        out.push('\u{1f}');
        out.push_str(&canon(range));
    }
    out
}

fn lookup<'a>(item: &'a RawItem, segments: &[&str]) -> Option<&'a AttrValue> {
    let (first, rest) = segments.split_first()?;
    let mut current = item.get(*first)?;
    for seg in rest {
        current = current.as_map()?.get(*seg)?;
    }
    Some(current)
}

enum Check<'a> {
    Compare(ComparisonOperator, &'a AttrValue),
    Exists,
    NotExists,
}

fn update_checks(expr: &UpdateExpression) -> Vec<(Vec<&str>, Check<'_>)> {
    expr.conditions()
        .iter()
        .map(|clause| match clause {
            ConditionClause::Compare { path, op, value } => (
                expr.resolve_path(path),
                Check::Compare(*op, expr.resolve_value(value)),
            ),
            ConditionClause::Exists(path) => (expr.resolve_path(path), Check::Exists),
            ConditionClause::NotExists(path) => (expr.resolve_path(path), Check::NotExists),
        })
        .collect()
}

fn put_checks(expr: &ConditionExpression) -> Vec<(Vec<&str>, Check<'_>)> {
    expr.conditions()
        .iter()
        .map(|clause| match clause {
            ConditionClause::Compare { path, op, value } => (
                expr.resolve_path(path),
                Check::Compare(*op, expr.resolve_value(value)),
            ),
            ConditionClause::Exists(path) => (expr.resolve_path(path), Check::Exists),
            ConditionClause::NotExists(path) => (expr.resolve_path(path), Check::NotExists),
        })
        .collect()
}

fn conditions_hold(item: Option<&RawItem>, checks: &[(Vec<&str>, Check<'_>)]) -> bool {
    checks.iter().all(|(segments, check)| {
        let actual = item.and_then(|i| lookup(i, segments));
        match check {
            Check::Compare(op, expected) => {
                actual.is_some_and(|a| evaluate_comparison(*op, a, expected))
            }
            Check::Exists => actual.is_some(),
            Check::NotExists => actual.is_none(),
        }
    })
}

/// Navigate to the map holding the path's leaf, creating intermediate maps
/// as the hosted store does for fresh nested writes.
fn parent_map<'a>(
    item: &'a mut RawItem,
    segments: &[&str],
) -> Result<&'a mut BTreeMap<String, AttrValue>, MemoryError> {
    let mut current = item;
    for seg in &segments[..segments.len() - 1] {
        let slot = current
            .entry((*seg).to_string())
            .or_insert_with(|| AttrValue::Map(BTreeMap::new()));
        current = slot
            .as_map_mut()
            .ok_or_else(|| MemoryError(format!("path segment `{seg}` is not a map")))?;
    }
    Ok(current)
}

fn set_at(item: &mut RawItem, segments: &[&str], value: AttrValue) -> Result<(), MemoryError> {
    let leaf = segments[segments.len() - 1].to_string();
    parent_map(item, segments)?.insert(leaf, value);
    Ok(())
}

fn remove_at(item: &mut RawItem, segments: &[&str]) {
    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut current = item;
    for seg in parents {
        current = match current.get_mut(*seg).and_then(AttrValue::as_map_mut) {
            Some(map) => map,
            None => return,
        };
    }
    current.remove(*leaf);
}

fn add_at(item: &mut RawItem, segments: &[&str], delta: AttrValue) -> Result<(), MemoryError> {
    let leaf = segments[segments.len() - 1].to_string();
    let parent = parent_map(item, segments)?;
    match parent.get_mut(&leaf) {
        None => {
            parent.insert(leaf, delta);
            Ok(())
        }
        Some(AttrValue::Num(existing)) => match delta {
            AttrValue::Num(d) => {
                *existing = existing.plus(d);
                Ok(())
            }
            _ => Err(MemoryError(format!("ADD to number `{leaf}` needs a number"))),
        },
        Some(AttrValue::StrSet(existing)) => match delta {
            AttrValue::StrSet(d) => {
                existing.extend(d);
                Ok(())
            }
            _ => Err(MemoryError(format!(
                "ADD to string set `{leaf}` needs a string set"
            ))),
        },
        Some(AttrValue::NumSet(existing)) => match delta {
            AttrValue::NumSet(d) => {
                for n in d {
                    if !existing.contains(&n) {
                        existing.push(n);
                    }
                }
                Ok(())
            }
            _ => Err(MemoryError(format!(
                "ADD to number set `{leaf}` needs a number set"
            ))),
        },
        Some(_) => Err(MemoryError(format!(
            "ADD target `{leaf}` is neither number nor set"
        ))),
    }
}

fn append_at(item: &mut RawItem, segments: &[&str], values: AttrValue) -> Result<(), MemoryError> {
    let appended = match values {
        AttrValue::List(l) => l,
        _ => return Err(MemoryError("append needs a list value".to_string())),
    };
    let leaf = segments[segments.len() - 1].to_string();
    let parent = parent_map(item, segments)?;
    match parent.get_mut(&leaf) {
        None => {
            parent.insert(leaf, AttrValue::List(appended));
            Ok(())
        }
        Some(AttrValue::List(existing)) => {
            existing.extend(appended);
            Ok(())
        }
        Some(_) => Err(MemoryError(format!("append target `{leaf}` is not a list"))),
    }
}

fn apply_update(item: &mut RawItem, expr: &UpdateExpression) -> Result<(), MemoryError> {
    for clause in expr.set() {
        let segments = expr.resolve_path(clause.path());
        set_at(item, &segments, expr.resolve_value(clause.value()).clone())?;
    }
    for path in expr.remove() {
        let segments = expr.resolve_path(path);
        remove_at(item, &segments);
    }
    for clause in expr.add() {
        let segments = expr.resolve_path(clause.path());
        add_at(item, &segments, expr.resolve_value(clause.value()).clone())?;
    }
    for clause in expr.append() {
        let segments = expr.resolve_path(clause.path());
        append_at(item, &segments, expr.resolve_value(clause.value()).clone())?;
    }
    Ok(())
}

fn ensure_key_attrs(item: &mut RawItem, key: &ItemKey) {
    item.entry(key.hash.0.clone())
        .or_insert_with(|| key.hash.1.clone());
    if let Some((attr, value)) = &key.range {
        item.entry(attr.clone()).or_insert_with(|| value.clone());
    }
}

impl ItemStore for MemoryStore {
    type Error = MemoryError;

    fn get_item(
        &self,
        table: &str,
        key: &ItemKey,
        _consistent: bool,
    ) -> Result<Option<RawItem>, Self::Error> {
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.get(&canon_key(key)))
            .cloned())
    }

    fn put_item(
        &mut self,
        table: &str,
        key: &ItemKey,
        mut item: RawItem,
        condition: &ConditionExpression,
    ) -> Result<WriteOutcome, Self::Error> {
        let table_map = self.tables.entry(table.to_string()).or_default();
        let key_str = canon_key(key);
        if !conditions_hold(table_map.get(&key_str), &put_checks(condition)) {
            return Ok(WriteOutcome::ConditionFailed);
        }
        ensure_key_attrs(&mut item, key);
        table_map.insert(key_str, item.clone());
        Ok(WriteOutcome::Applied(item))
    }

    fn update_item(
        &mut self,
        table: &str,
        key: &ItemKey,
        expression: &UpdateExpression,
    ) -> Result<WriteOutcome, Self::Error> {
        let table_map = self.tables.entry(table.to_string()).or_default();
        let key_str = canon_key(key);
        let existing = table_map.get(&key_str);
        if !conditions_hold(existing, &update_checks(expression)) {
            return Ok(WriteOutcome::ConditionFailed);
        }
        let mut item = existing.cloned().unwrap_or_default();
        ensure_key_attrs(&mut item, key);
        apply_update(&mut item, expression)?;
        table_map.insert(key_str, item.clone());
        Ok(WriteOutcome::Applied(item))
    }

    fn delete_item(&mut self, table: &str, key: &ItemKey) -> Result<(), Self::Error> {
        if let Some(table_map) = self.tables.get_mut(table) {
            table_map.remove(&canon_key(key));
        }
        Ok(())
    }

    fn query(&self, table: &str, condition: &KeyCondition) -> Result<Vec<RawItem>, Self::Error> {
        let Some(table_map) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        let (hash_attr, hash_value) = &condition.hash;
        let mut matches: Vec<&RawItem> = table_map
            .values()
            .filter(|item| item.get(hash_attr.as_str()) == Some(hash_value))
            .filter(|item| match &condition.range {
                None => true,
                Some((range_attr, range_cond)) => item
                    .get(range_attr.as_str())
                    .is_some_and(|v| range_cond.matches(v)),
            })
            .collect();
        if let Some((range_attr, _)) = &condition.range {
            matches.sort_by_key(|item| {
                item.get(range_attr.as_str()).map(canon).unwrap_or_default()
            });
        }
        Ok(matches.into_iter().cloned().collect())
    }

    fn scan(&self, table: &str) -> Result<Vec<RawItem>, Self::Error> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn batch_get_items(
        &self,
        table: &str,
        keys: &[ItemKey],
    ) -> Result<BatchGetOutput, Self::Error> {
        let mut output = BatchGetOutput::default();
        for key in keys {
            if let Some(item) = self.get_item(table, key, false)? {
                output.items.push(item);
            }
        }
        Ok(output)
    }

    fn batch_write_items(
        &mut self,
        table: &str,
        items: Vec<(ItemKey, RawItem)>,
    ) -> Result<Vec<ItemKey>, Self::Error> {
        let table_map = self.tables.entry(table.to_string()).or_default();
        for (key, mut item) in items {
            ensure_key_attrs(&mut item, &key);
            table_map.insert(canon_key(&key), item);
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmap::{Condition, ExpressionBuilder, Path};

    fn key(hash: &str) -> ItemKey {
        ItemKey::new("id", AttrValue::from(hash))
    }

    fn item(hash: &str) -> RawItem {
        let mut item = RawItem::new();
        item.insert("id".to_string(), AttrValue::from(hash));
        item
    }

    #[test]
    fn put_get_delete() {
        let mut store = MemoryStore::new();
        store
            .put_item("t", &key("a"), item("a"), &ConditionExpression::default())
            .unwrap();
        assert!(store.get_item("t", &key("a"), false).unwrap().is_some());
        store.delete_item("t", &key("a")).unwrap();
        assert!(store.get_item("t", &key("a"), false).unwrap().is_none());
    }

    #[test]
    fn conditional_put_rejected_atomically() {
        let mut store = MemoryStore::new();
        let not_exists =
            ConditionExpression::from_conditions(&[Condition::NotExists(Path::root("id"))]);
        let first = store
            .put_item("t", &key("a"), item("a"), &not_exists)
            .unwrap();
        assert!(matches!(first, WriteOutcome::Applied(_)));

        let mut replacement = item("a");
        replacement.insert("name".to_string(), AttrValue::from("x"));
        let second = store
            .put_item("t", &key("a"), replacement, &not_exists)
            .unwrap();
        assert_eq!(second, WriteOutcome::ConditionFailed);
        // Stored item unchanged.
        let stored = store.get_item("t", &key("a"), false).unwrap().unwrap();
        assert!(!stored.contains_key("name"));
    }

    #[test]
    fn update_creates_item_with_key_attrs() {
        let mut store = MemoryStore::new();
        let mut b = ExpressionBuilder::new();
        b.push_set(&Path::root("name"), AttrValue::from("x"));
        let outcome = store.update_item("t", &key("a"), &b.build()).unwrap();
        let WriteOutcome::Applied(stored) = outcome else {
            panic!("expected applied");
        };
        assert_eq!(stored["id"], AttrValue::from("a"));
        assert_eq!(stored["name"], AttrValue::from("x"));
    }

    #[test]
    fn update_applies_all_clause_kinds() {
        let mut store = MemoryStore::new();
        let mut seed = item("a");
        seed.insert("gone".to_string(), AttrValue::from(1i64));
        seed.insert(
            "log".to_string(),
            AttrValue::List(vec![AttrValue::from("first")]),
        );
        store
            .put_item("t", &key("a"), seed, &ConditionExpression::default())
            .unwrap();

        let mut b = ExpressionBuilder::new();
        b.push_set(&Path::root("name"), AttrValue::from("x"));
        b.push_remove(&Path::root("gone"));
        b.push_add(&Path::root("count"), AttrValue::from(2i64));
        b.push_add(&Path::root("count"), AttrValue::from(3i64));
        b.push_append(&Path::root("log"), vec![AttrValue::from("second")]);
        store.update_item("t", &key("a"), &b.build()).unwrap();

        let stored = store.get_item("t", &key("a"), false).unwrap().unwrap();
        assert_eq!(stored["name"], AttrValue::from("x"));
        assert!(!stored.contains_key("gone"));
        assert_eq!(stored["count"], AttrValue::from(5i64));
        assert_eq!(stored["log"].as_list().unwrap().len(), 2);
    }

    #[test]
    fn update_nested_path_creates_intermediate_maps() {
        let mut store = MemoryStore::new();
        let mut b = ExpressionBuilder::new();
        b.push_add(&Path::root("bal").child("gold"), AttrValue::from(7i64));
        store.update_item("t", &key("a"), &b.build()).unwrap();

        let stored = store.get_item("t", &key("a"), false).unwrap().unwrap();
        assert_eq!(
            stored["bal"].as_map().unwrap()["gold"],
            AttrValue::from(7i64)
        );
    }

    #[test]
    fn failed_condition_leaves_item_untouched() {
        let mut store = MemoryStore::new();
        let mut seed = item("a");
        seed.insert("count".to_string(), AttrValue::from(2i64));
        store
            .put_item("t", &key("a"), seed, &ConditionExpression::default())
            .unwrap();

        let mut b = ExpressionBuilder::new();
        b.push_add(&Path::root("count"), AttrValue::from(1i64));
        b.push_condition(Condition::Compare {
            path: Path::root("count"),
            op: ComparisonOperator::Lt,
            value: AttrValue::from(2i64),
        });
        let outcome = store.update_item("t", &key("a"), &b.build()).unwrap();
        assert_eq!(outcome, WriteOutcome::ConditionFailed);
        let stored = store.get_item("t", &key("a"), false).unwrap().unwrap();
        assert_eq!(stored["count"], AttrValue::from(2i64));
    }

    #[test]
    fn add_unions_string_sets() {
        use std::collections::BTreeSet;
        let mut store = MemoryStore::new();
        let mut seed = item("a");
        seed.insert(
            "tags".to_string(),
            AttrValue::StrSet(BTreeSet::from(["x".to_string()])),
        );
        store
            .put_item("t", &key("a"), seed, &ConditionExpression::default())
            .unwrap();

        let mut b = ExpressionBuilder::new();
        b.push_add(
            &Path::root("tags"),
            AttrValue::StrSet(BTreeSet::from(["x".to_string(), "y".to_string()])),
        );
        store.update_item("t", &key("a"), &b.build()).unwrap();

        let stored = store.get_item("t", &key("a"), false).unwrap().unwrap();
        assert_eq!(stored["tags"].as_str_set().unwrap().len(), 2);
    }

    #[test]
    fn add_type_mismatch_is_an_error() {
        let mut store = MemoryStore::new();
        let mut seed = item("a");
        seed.insert("name".to_string(), AttrValue::from("x"));
        store
            .put_item("t", &key("a"), seed, &ConditionExpression::default())
            .unwrap();

        let mut b = ExpressionBuilder::new();
        b.push_add(&Path::root("name"), AttrValue::from(1i64));
        assert!(store.update_item("t", &key("a"), &b.build()).is_err());
    }

    #[test]
    fn query_filters_and_orders_by_range() {
        let mut store = MemoryStore::new();
        for (id, seq) in [("a", 2i64), ("a", 1), ("b", 3)] {
            let k = ItemKey::new("id", AttrValue::from(id))
                .with_range("seq", AttrValue::from(seq));
            let mut i = RawItem::new();
            i.insert("id".to_string(), AttrValue::from(id));
            i.insert("seq".to_string(), AttrValue::from(seq));
            store
                .put_item("t", &k, i, &ConditionExpression::default())
                .unwrap();
        }

        let results = store
            .query(
                "t",
                &KeyCondition {
                    hash: ("id".to_string(), AttrValue::from("a")),
                    range: Some((
                        "seq".to_string(),
                        crate::traits::RangeCondition::Ge(AttrValue::from(1i64)),
                    )),
                },
            )
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["seq"], AttrValue::from(1i64));
        assert_eq!(results[1]["seq"], AttrValue::from(2i64));
    }

    #[test]
    fn batch_roundtrip() {
        let mut store = MemoryStore::new();
        let unprocessed = store
            .batch_write_items(
                "t",
                vec![(key("a"), item("a")), (key("b"), item("b"))],
            )
            .unwrap();
        assert!(unprocessed.is_empty());

        let output = store
            .batch_get_items("t", &[key("a"), key("b"), key("missing")])
            .unwrap();
        assert_eq!(output.items.len(), 2);
        assert!(output.unprocessed.is_empty());
    }

    #[test]
    fn tables_are_isolated() {
        let mut store = MemoryStore::new();
        store
            .put_item("t1", &key("a"), item("a"), &ConditionExpression::default())
            .unwrap();
        assert!(store.get_item("t2", &key("a"), false).unwrap().is_none());
        assert_eq!(store.item_count(), 1);
    }
}
