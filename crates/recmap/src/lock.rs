use alloc::vec::Vec;

use crate::expression::{ComparisonOperator, Condition, ExpressionBuilder, Path};
use crate::schema::TableSchema;
use crate::value::AttrValue;

/// Precondition on the stored revision for one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionGuard {
    /// No precondition (locking disabled, or disabled for this write).
    None,
    /// The stored revision must equal the captured value.
    Expect(u64),
    /// The revision attribute must not exist yet (first write).
    NotExists,
}

impl RevisionGuard {
    fn condition(self, schema: &TableSchema) -> Option<Condition> {
        let path = Path::root(schema.revision_attr());
        match self {
            Self::None => None,
            Self::Expect(rev) => Some(Condition::Compare {
                path,
                op: ComparisonOperator::Eq,
                value: AttrValue::from(rev),
            }),
            Self::NotExists => Some(Condition::NotExists(path)),
        }
    }
}

/// Revision clauses for a partial update.
///
/// When the table enables optimistic locking, every update carries a
/// server-side `ADD revision 1` so each accepted write advances the counter —
/// including writes that explicitly opt out of the precondition
/// (last-writer-wins, but the revision still moves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateLock {
    increment: bool,
    guard: RevisionGuard,
}

impl UpdateLock {
    /// Compute the lock clauses for one update.
    ///
    /// `base_revision` is the revision captured when the base record was
    /// loaded (`None` for a record never persisted). `disabled` is the
    /// per-write opt-out.
    #[must_use]
    pub fn for_update(schema: &TableSchema, base_revision: Option<u64>, disabled: bool) -> Self {
        if !schema.optimistic_locking() {
            return Self {
                increment: false,
                guard: RevisionGuard::None,
            };
        }
        let guard = if disabled {
            RevisionGuard::None
        } else {
            match base_revision {
                Some(rev) if rev > 0 => RevisionGuard::Expect(rev),
                _ => RevisionGuard::NotExists,
            }
        };
        Self {
            increment: true,
            guard,
        }
    }

    /// Whether a revision precondition is part of this write.
    #[must_use]
    pub fn guarded(&self) -> bool {
        self.guard != RevisionGuard::None
    }

    /// Append the revision clauses to an expression under construction.
    pub fn apply(&self, schema: &TableSchema, builder: &mut ExpressionBuilder) {
        if self.increment {
            builder.push_add(&Path::root(schema.revision_attr()), AttrValue::from(1u64));
        }
        if let Some(cond) = self.guard.condition(schema) {
            builder.push_condition(cond);
        }
    }
}

/// Revision and existence clauses for a full save (put).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveLock {
    stamped_revision: Option<u64>,
    guard: RevisionGuard,
    overwrite_guard: bool,
}

impl SaveLock {
    /// Compute the lock clauses for one save.
    ///
    /// `record_revision` is the revision carried by the record being saved.
    /// `disable_overwrite` requires the key to not exist yet;
    /// `disable_locking` drops the revision precondition for this write.
    #[must_use]
    pub fn for_save(
        schema: &TableSchema,
        record_revision: Option<u64>,
        disable_overwrite: bool,
        disable_locking: bool,
    ) -> Self {
        let (stamped, guard) = if schema.optimistic_locking() {
            let base = record_revision.unwrap_or(0);
            let guard = if disable_locking {
                RevisionGuard::None
            } else if base > 0 {
                RevisionGuard::Expect(base)
            } else {
                RevisionGuard::NotExists
            };
            (Some(base + 1), guard)
        } else {
            (None, RevisionGuard::None)
        };
        Self {
            stamped_revision: stamped,
            guard,
            overwrite_guard: disable_overwrite,
        }
    }

    /// Revision value to write into the item, if locking is enabled.
    #[must_use]
    pub fn stamped_revision(&self) -> Option<u64> {
        self.stamped_revision
    }

    /// Whether a revision precondition is part of this write.
    #[must_use]
    pub fn revision_guarded(&self) -> bool {
        self.guard != RevisionGuard::None
    }

    /// Whether the key-must-not-exist precondition is part of this write.
    #[must_use]
    pub fn overwrite_guarded(&self) -> bool {
        self.overwrite_guard
    }

    /// The conditions to attach to the put.
    #[must_use]
    pub fn conditions(&self, schema: &TableSchema) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if self.overwrite_guard {
            let hash_storage = schema.field(schema.hash_key()).storage.clone();
            conditions.push(Condition::NotExists(Path::root(hash_storage)));
        }
        if let Some(cond) = self.guard.condition(schema) {
            conditions.push(cond);
        }
        conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, FieldKind, TableSchema, TypeDefinition};
    use alloc::vec;

    fn locked_schema() -> TableSchema {
        TableSchema::builder("docs", "Doc", "id")
            .optimistic_locking(true)
            .types(vec![TypeDefinition::new(
                "Doc",
                vec![
                    FieldDefinition::new("id", FieldKind::String),
                    FieldDefinition::new("name", FieldKind::String),
                ],
            )])
            .build()
            .unwrap()
    }

    fn unlocked_schema() -> TableSchema {
        TableSchema::builder("docs", "Doc", "id")
            .types(vec![TypeDefinition::new(
                "Doc",
                vec![FieldDefinition::new("id", FieldKind::String)],
            )])
            .build()
            .unwrap()
    }

    #[test]
    fn update_lock_guards_on_captured_revision() {
        let schema = locked_schema();
        let lock = UpdateLock::for_update(&schema, Some(3), false);
        assert!(lock.guarded());

        let mut b = ExpressionBuilder::new();
        lock.apply(&schema, &mut b);
        let expr = b.build();
        assert_eq!(expr.add().len(), 1);
        assert_eq!(expr.condition_expression().unwrap(), "#n0 = :v1");
    }

    #[test]
    fn update_lock_first_write_requires_absence() {
        let schema = locked_schema();
        let lock = UpdateLock::for_update(&schema, None, false);
        let mut b = ExpressionBuilder::new();
        lock.apply(&schema, &mut b);
        let expr = b.build();
        assert_eq!(
            expr.condition_expression().unwrap(),
            "attribute_not_exists(#n0)"
        );
    }

    #[test]
    fn update_lock_disabled_still_increments() {
        let schema = locked_schema();
        let lock = UpdateLock::for_update(&schema, Some(3), true);
        assert!(!lock.guarded());

        let mut b = ExpressionBuilder::new();
        lock.apply(&schema, &mut b);
        let expr = b.build();
        assert_eq!(expr.add().len(), 1);
        assert!(expr.condition_expression().is_none());
    }

    #[test]
    fn update_lock_inert_without_table_locking() {
        let schema = unlocked_schema();
        let lock = UpdateLock::for_update(&schema, Some(3), false);
        let mut b = ExpressionBuilder::new();
        lock.apply(&schema, &mut b);
        let expr = b.build();
        assert!(expr.is_empty());
        assert!(expr.condition_expression().is_none());
    }

    #[test]
    fn save_lock_stamps_next_revision() {
        let schema = locked_schema();
        let lock = SaveLock::for_save(&schema, Some(2), false, false);
        assert_eq!(lock.stamped_revision(), Some(3));
        assert!(lock.revision_guarded());
        assert_eq!(lock.conditions(&schema).len(), 1);
    }

    #[test]
    fn save_lock_first_save() {
        let schema = locked_schema();
        let lock = SaveLock::for_save(&schema, None, false, false);
        assert_eq!(lock.stamped_revision(), Some(1));
        assert_eq!(
            lock.conditions(&schema),
            vec![Condition::NotExists(Path::root("_rv"))]
        );
    }

    #[test]
    fn save_lock_disable_overwrite_conditions_on_key() {
        let schema = locked_schema();
        let lock = SaveLock::for_save(&schema, None, true, true);
        assert!(lock.overwrite_guarded());
        assert!(!lock.revision_guarded());
        assert_eq!(
            lock.conditions(&schema),
            vec![Condition::NotExists(Path::root("id"))]
        );
        // Revision still advances even with the precondition dropped.
        assert_eq!(lock.stamped_revision(), Some(1));
    }
}
