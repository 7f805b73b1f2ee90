use alloc::collections::btree_map::Entry;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::expression::{
    ComparisonOperator, Condition, ExpressionBuilder, Path, UpdateExpression,
};
use crate::lock::UpdateLock;
use crate::record::{Record, RecordKey};
use crate::schema::TableSchema;
use crate::value::{AttrValue, Number};

/// One pending mutation of a single path.
#[derive(Debug, Clone, PartialEq)]
enum FieldMutation {
    Set(AttrValue),
    Remove,
    Add(Number),
    AddToSet(AttrValue),
    Append(Vec<AttrValue>),
}

/// Delta container for one record: accumulates field-level mutations and
/// server-side conditions, then compiles once into an [`UpdateExpression`].
///
/// Mutations address fields by logical name; nested fields use dot paths
/// (`"stats.bio"`), and map entries are addressed individually so that
/// writers touching disjoint entries of the same map never clobber each
/// other. An explicit `set` on a path dominates: increments recorded for the
/// same exact path — before or after the set — are dropped when compiling.
///
/// # Example
///
/// ```
/// use recmap::{FieldDefinition, FieldKind, RecordKey, RecordUpdate,
///              TableSchema, TypeDefinition};
/// use std::sync::Arc;
///
/// let schema = Arc::new(
///     TableSchema::builder("counters", "Counter", "id")
///         .types(vec![TypeDefinition::new(
///             "Counter",
///             vec![
///                 FieldDefinition::new("id", FieldKind::String),
///                 FieldDefinition::new("hits", FieldKind::Number),
///             ],
///         )])
///         .build()
///         .unwrap(),
/// );
///
/// let mut update = RecordUpdate::new(schema, RecordKey::hash("c1"));
/// update.increment("hits", 1i64);
/// let expr = update.compile();
/// assert_eq!(expr.update_expression(), "ADD #n0 :v0");
/// ```
#[derive(Debug)]
pub struct RecordUpdate {
    schema: Arc<TableSchema>,
    key: RecordKey,
    suffix: Option<String>,
    base_revision: Option<u64>,
    disable_locking: bool,
    mutations: BTreeMap<Path, FieldMutation>,
    conditions: Vec<Condition>,
}

impl RecordUpdate {
    /// Start an empty update for the record at `key`.
    #[must_use]
    pub fn new(schema: Arc<TableSchema>, key: RecordKey) -> Self {
        Self {
            schema,
            key,
            suffix: None,
            base_revision: None,
            disable_locking: false,
            mutations: BTreeMap::new(),
            conditions: Vec::new(),
        }
    }

    /// Start an update from a loaded record, capturing its key and the
    /// revision the optimistic-lock condition will expect.
    #[must_use]
    pub fn for_record<R: Record>(schema: Arc<TableSchema>, record: &R) -> Self {
        let mut update = Self::new(schema, record.key());
        update.base_revision = record.revision();
        update
    }

    /// Route this update to a suffixed physical table.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Expect this stored revision instead of the one captured at
    /// construction.
    pub fn expect_revision(&mut self, revision: u64) {
        self.base_revision = Some(revision);
    }

    /// Drop the revision precondition for this write only. The revision
    /// still advances on success.
    pub fn disable_optimistic_locking(&mut self) {
        self.disable_locking = true;
    }

    /// The table schema this update is bound to.
    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// The target record key.
    #[must_use]
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// The target table suffix, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Whether the compiled write will carry a revision precondition.
    #[must_use]
    pub fn revision_guarded(&self) -> bool {
        self.schema.optimistic_locking() && !self.disable_locking
    }

    /// Assign a value to a field (dot path for nested fields).
    pub fn set_field(&mut self, field_path: &str, value: impl Into<AttrValue>) {
        let path = self.resolve(field_path);
        self.record(path, FieldMutation::Set(value.into()));
    }

    /// Remove a field (dot path for nested fields).
    pub fn remove_field(&mut self, field_path: &str) {
        let path = self.resolve(field_path);
        self.record(path, FieldMutation::Remove);
    }

    /// Add a delta to a numeric field, server-side.
    pub fn increment(&mut self, field_path: &str, delta: impl Into<Number>) {
        let path = self.resolve(field_path);
        self.record(path, FieldMutation::Add(delta.into()));
    }

    /// Assign one entry of a map field, leaving other entries untouched.
    pub fn set_map_entry(&mut self, field_path: &str, entry: &str, value: impl Into<AttrValue>) {
        let path = self.resolve(field_path).child(entry);
        self.record(path, FieldMutation::Set(value.into()));
    }

    /// Remove one entry of a map field.
    pub fn remove_map_entry(&mut self, field_path: &str, entry: &str) {
        let path = self.resolve(field_path).child(entry);
        self.record(path, FieldMutation::Remove);
    }

    /// Add a delta to one numeric entry of a map field, server-side.
    pub fn increment_map_entry(&mut self, field_path: &str, entry: &str, delta: impl Into<Number>) {
        let path = self.resolve(field_path).child(entry);
        self.record(path, FieldMutation::Add(delta.into()));
    }

    /// Union values into a set field, server-side. `values` must be a
    /// [`AttrValue::StrSet`] or [`AttrValue::NumSet`].
    pub fn add_to_set(&mut self, field_path: &str, values: AttrValue) {
        let path = self.resolve(field_path);
        self.record(path, FieldMutation::AddToSet(values));
    }

    /// Append values to the end of a list field, server-side.
    pub fn append_to_list(&mut self, field_path: &str, values: Vec<AttrValue>) {
        let path = self.resolve(field_path);
        self.record(path, FieldMutation::Append(values));
    }

    /// Declare a comparison condition on a field. All declared conditions
    /// AND-combine with the optimistic-lock condition; any failure rejects
    /// the entire write.
    pub fn add_condition(
        &mut self,
        field_path: &str,
        op: ComparisonOperator,
        value: impl Into<AttrValue>,
    ) {
        let path = self.resolve(field_path);
        self.conditions.push(Condition::Compare {
            path,
            op,
            value: value.into(),
        });
    }

    /// Declare one comparison per named entry of a map field.
    pub fn add_map_entries_condition(
        &mut self,
        field_path: &str,
        entries: Vec<(String, AttrValue)>,
        op: ComparisonOperator,
    ) {
        let base = self.resolve(field_path);
        for (entry, value) in entries {
            self.conditions.push(Condition::Compare {
                path: base.clone().child(entry),
                op,
                value,
            });
        }
    }

    /// Declare that a field must exist.
    pub fn add_exists_condition(&mut self, field_path: &str) {
        let path = self.resolve(field_path);
        self.conditions.push(Condition::Exists(path));
    }

    /// Declare that a field must not exist.
    pub fn add_not_exists_condition(&mut self, field_path: &str) {
        let path = self.resolve(field_path);
        self.conditions.push(Condition::NotExists(path));
    }

    /// Compile into the normalized clause set, including the revision
    /// clauses. Call once; the update is spent after the write consumes it.
    #[must_use]
    pub fn compile(&self) -> UpdateExpression {
        let mut builder = ExpressionBuilder::new();
        for (path, mutation) in &self.mutations {
            match mutation {
                FieldMutation::Set(value) => builder.push_set(path, value.clone()),
                FieldMutation::Remove => builder.push_remove(path),
                FieldMutation::Add(delta) => builder.push_add(path, AttrValue::Num(*delta)),
                FieldMutation::AddToSet(values) => builder.push_add(path, values.clone()),
                FieldMutation::Append(values) => builder.push_append(path, values.clone()),
            }
        }
        for condition in &self.conditions {
            builder.push_condition(condition.clone());
        }
        UpdateLock::for_update(&self.schema, self.base_revision, self.disable_locking)
            .apply(&self.schema, &mut builder);
        builder.build()
    }

    /// Resolve a dotted logical path to storage segments, walking nested
    /// types.
    ///
    /// # Panics
    ///
    /// Panics when a segment names a field absent from its type, or when an
    /// intermediate segment is not an embedded object — both programming
    /// errors in the caller.
    fn resolve(&self, field_path: &str) -> Path {
        let mut ty = self.schema.root_type();
        let mut path: Option<Path> = None;
        let mut segments = field_path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let field = ty.field(segment).unwrap_or_else(|| {
                panic!(
                    "table {}: type {} has no field `{segment}`",
                    self.schema.table_name(),
                    ty.name
                )
            });
            path = Some(match path {
                None => Path::root(field.storage.as_str()),
                Some(p) => p.child(field.storage.as_str()),
            });
            if segments.peek().is_some() {
                let object = field.kind.object_type().unwrap_or_else(|| {
                    panic!(
                        "table {}: field `{segment}` is not an embedded object",
                        self.schema.table_name()
                    )
                });
                ty = self.schema.type_def(object);
            }
        }
        path.expect("field path must not be empty")
    }

    fn record(&mut self, path: Path, incoming: FieldMutation) {
        match self.mutations.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
                // SET dominance: an explicit assignment (or removal) beats
                // accumulated deltas on the same path, in either call order.
                (
                    FieldMutation::Set(_) | FieldMutation::Remove,
                    FieldMutation::Add(_) | FieldMutation::AddToSet(_) | FieldMutation::Append(_),
                ) => {}
                (FieldMutation::Add(prev), FieldMutation::Add(delta)) => {
                    *prev = prev.plus(delta);
                }
                (FieldMutation::AddToSet(prev), FieldMutation::AddToSet(values)) => {
                    union_sets(prev, values);
                }
                (FieldMutation::Append(prev), FieldMutation::Append(mut values)) => {
                    prev.append(&mut values);
                }
                (current, incoming) => *current = incoming,
            },
        }
    }
}

fn union_sets(target: &mut AttrValue, incoming: AttrValue) {
    match (target, incoming) {
        (AttrValue::StrSet(t), AttrValue::StrSet(i)) => t.extend(i),
        (AttrValue::NumSet(t), AttrValue::NumSet(i)) => {
            for n in i {
                if !t.contains(&n) {
                    t.push(n);
                }
            }
        }
        (t, i) => *t = i,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, FieldKind, TypeDefinition};
    use alloc::boxed::Box;
    use alloc::vec;

    fn schema(optimistic: bool) -> Arc<TableSchema> {
        Arc::new(
            TableSchema::builder("players", "Player", "player_id")
                .range_key("sequence")
                .optimistic_locking(optimistic)
                .types(vec![
                    TypeDefinition::new(
                        "Player",
                        vec![
                            FieldDefinition::new("player_id", FieldKind::String).stored_as("id"),
                            FieldDefinition::new("sequence", FieldKind::Number).stored_as("seq"),
                            FieldDefinition::new("alias", FieldKind::String),
                            FieldDefinition::new(
                                "balances",
                                FieldKind::Map(Box::new(FieldKind::Number)),
                            )
                            .stored_as("bal"),
                            FieldDefinition::new(
                                "stats",
                                FieldKind::Object(String::from("Stats")),
                            )
                            .stored_as("st"),
                            FieldDefinition::new(
                                "log",
                                FieldKind::List(Box::new(FieldKind::String)),
                            ),
                            FieldDefinition::new("tags", FieldKind::StringSet),
                        ],
                    ),
                    TypeDefinition::new(
                        "Stats",
                        vec![
                            FieldDefinition::new("bio", FieldKind::String),
                            FieldDefinition::new(
                                "wins",
                                FieldKind::Map(Box::new(FieldKind::Number)),
                            ),
                        ],
                    ),
                ])
                .build()
                .unwrap(),
        )
    }

    fn update() -> RecordUpdate {
        RecordUpdate::new(schema(false), RecordKey::hash_range("p1", 1i64))
    }

    #[test]
    fn set_then_increment_keeps_set() {
        let mut u = update();
        u.set_map_entry("balances", "gold", 10i64);
        u.increment_map_entry("balances", "gold", 1i64);
        let expr = u.compile();
        assert_eq!(expr.set().len(), 1);
        assert!(expr.add().is_empty());
        assert_eq!(
            expr.resolve_value(expr.set()[0].value()),
            &AttrValue::from(10i64)
        );
    }

    #[test]
    fn increment_then_set_keeps_set() {
        let mut u = update();
        u.increment_map_entry("balances", "gold", 1i64);
        u.set_map_entry("balances", "gold", 10i64);
        let expr = u.compile();
        assert_eq!(expr.set().len(), 1);
        assert!(expr.add().is_empty());
        assert_eq!(
            expr.resolve_value(expr.set()[0].value()),
            &AttrValue::from(10i64)
        );
    }

    #[test]
    fn increments_accumulate() {
        let mut u = update();
        u.increment_map_entry("balances", "gold", 2i64);
        u.increment_map_entry("balances", "gold", 3i64);
        let expr = u.compile();
        assert_eq!(expr.add().len(), 1);
        assert_eq!(
            expr.resolve_value(expr.add()[0].value()),
            &AttrValue::from(5i64)
        );
    }

    #[test]
    fn disjoint_map_entries_coexist() {
        let mut u = update();
        u.set_map_entry("balances", "gold", 10i64);
        u.increment_map_entry("balances", "silver", 1i64);
        let expr = u.compile();
        assert_eq!(expr.set().len(), 1);
        assert_eq!(expr.add().len(), 1);
        assert_eq!(
            expr.resolve_path(expr.set()[0].path()),
            vec!["bal", "gold"]
        );
        assert_eq!(
            expr.resolve_path(expr.add()[0].path()),
            vec!["bal", "silver"]
        );
    }

    #[test]
    fn nested_paths_resolve_to_storage_names() {
        let mut u = update();
        u.set_field("stats.bio", "hello");
        u.increment("stats.wins.ranked", 1i64);
        let expr = u.compile();
        assert_eq!(expr.resolve_path(expr.set()[0].path()), vec!["st", "bio"]);
        assert_eq!(
            expr.resolve_path(expr.add()[0].path()),
            vec!["st", "wins", "ranked"]
        );
    }

    #[test]
    #[should_panic(expected = "no field")]
    fn unknown_field_panics() {
        let mut u = update();
        u.set_field("ghost", 1i64);
    }

    #[test]
    #[should_panic(expected = "not an embedded object")]
    fn dotting_into_scalar_panics() {
        let mut u = update();
        u.set_field("alias.sub", 1i64);
    }

    #[test]
    fn remove_beats_later_increment() {
        let mut u = update();
        u.remove_field("alias");
        u.increment("alias", 1i64);
        let expr = u.compile();
        assert_eq!(expr.remove().len(), 1);
        assert!(expr.add().is_empty());
    }

    #[test]
    fn set_adds_union() {
        use alloc::collections::BTreeSet;
        let mut u = update();
        u.add_to_set(
            "tags",
            AttrValue::StrSet(BTreeSet::from([String::from("a")])),
        );
        u.add_to_set(
            "tags",
            AttrValue::StrSet(BTreeSet::from([String::from("b")])),
        );
        let expr = u.compile();
        assert_eq!(expr.add().len(), 1);
        let unioned = expr.resolve_value(expr.add()[0].value());
        assert_eq!(unioned.as_str_set().unwrap().len(), 2);
    }

    #[test]
    fn appends_accumulate() {
        let mut u = update();
        u.append_to_list("log", vec![AttrValue::from("a")]);
        u.append_to_list("log", vec![AttrValue::from("b")]);
        let expr = u.compile();
        assert_eq!(expr.append().len(), 1);
        let appended = expr.resolve_value(expr.append()[0].value());
        assert_eq!(appended.as_list().unwrap().len(), 2);
    }

    #[test]
    fn conditions_compile_alongside_clauses() {
        let mut u = update();
        u.increment_map_entry("balances", "gold", 1i64);
        u.add_map_entries_condition(
            "balances",
            vec![(String::from("gold"), AttrValue::from(2i64))],
            ComparisonOperator::Lt,
        );
        u.add_condition("alias", ComparisonOperator::Eq, "x");
        u.add_exists_condition("stats.bio");
        let expr = u.compile();
        assert_eq!(expr.conditions().len(), 3);
        assert_eq!(
            expr.condition_expression().unwrap(),
            "#n0.#n1 < :v1 AND #n2 = :v2 AND attribute_exists(#n3.#n4)"
        );
    }

    #[test]
    fn locking_adds_revision_clauses() {
        let mut u = RecordUpdate::new(schema(true), RecordKey::hash_range("p1", 1i64));
        u.expect_revision(4);
        u.set_field("alias", "x");
        assert!(u.revision_guarded());
        let expr = u.compile();
        assert_eq!(expr.add().len(), 1); // revision increment
        assert!(expr.condition_expression().unwrap().contains("= :v"));
    }

    #[test]
    fn disabled_locking_drops_guard_keeps_increment() {
        let mut u = RecordUpdate::new(schema(true), RecordKey::hash_range("p1", 1i64));
        u.expect_revision(4);
        u.disable_optimistic_locking();
        assert!(!u.revision_guarded());
        let expr = u.compile();
        assert_eq!(expr.add().len(), 1);
        assert!(expr.condition_expression().is_none());
    }
}
