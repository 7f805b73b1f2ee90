//! # recmap
//!
//! Schema-driven record model for hosted key/range item stores.
//!
//! A record lives in one table, addressed by a hash key and an optional
//! range key. This crate holds everything that makes concurrent,
//! schema-evolving writes against such a store correct:
//!
//! - an immutable [`TableSchema`] describing record types, keys, indexes,
//!   and structural field encodings, validated eagerly at load;
//! - the [`RecordUpdate`] delta container, which turns field-level mutation
//!   calls into a normalized, atomic [`UpdateExpression`] (SET / REMOVE /
//!   ADD / append clauses plus AND-combined server-side conditions);
//! - the optimistic-concurrency clauses ([`UpdateLock`], [`SaveLock`]) built
//!   on a per-record revision counter.
//!
//! Reading, writing, and migrating records happens in the companion crates
//! `recmap-store` and `recmap-migrate`; declarative schema loading lives in
//! `recmap-schema`.
//!
//! ## Quick Start
//!
//! ```
//! use recmap::{FieldDefinition, FieldKind, RecordKey, RecordUpdate,
//!              TableSchema, TypeDefinition};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     TableSchema::builder("players", "Player", "player_id")
//!         .optimistic_locking(true)
//!         .types(vec![TypeDefinition::new(
//!             "Player",
//!             vec![
//!                 FieldDefinition::new("player_id", FieldKind::String),
//!                 FieldDefinition::new("alias", FieldKind::String),
//!             ],
//!         )])
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut update = RecordUpdate::new(schema, RecordKey::hash("p-1"));
//! update.set_field("alias", "new alias");
//! let expr = update.compile();
//! assert!(expr.update_expression().starts_with("SET "));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod expression;
mod lock;
mod record;
mod schema;
mod update;
mod value;

pub use expression::{
    evaluate_comparison, AddClause, AppendClause, ComparisonOperator, Condition,
    ConditionClause, ConditionExpression, ExpressionBuilder, Path, PathRef, SetClause,
    UpdateExpression, ValueRef,
};
pub use lock::{RevisionGuard, SaveLock, UpdateLock};
pub use record::{
    optional_i64, optional_str, optional_str_list, required, required_i64, required_str,
    Record, RecordError, RecordKey,
};
pub use schema::{
    CompressedPath, FieldDefinition, FieldKind, IndexDefinition, KeyedListPath, SchemaError,
    SchemaRegistry, TableSchema, TableSchemaBuilder, TypeDefinition,
    DEFAULT_REVISION_ATTR, DEFAULT_SCHEMA_VERSION_ATTR,
};
pub use update::RecordUpdate;
pub use value::{AttrValue, Number, RawItem};
