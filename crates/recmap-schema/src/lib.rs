//! # recmap-schema
//!
//! Declarative TOML table definitions for [`recmap`](https://docs.rs/recmap).
//!
//! A table definition names the table, its keys, its version, its secondary
//! indexes, and the tree of record types with their structural field
//! encodings. Definitions are parsed, validated, and compiled into the core
//! [`recmap::TableSchema`] model at registry initialization — a malformed
//! definition fails the load, never the first use.
//!
//! ## Quick Start
//!
//! ```
//! let source = r#"
//! [table]
//! name = "counters"
//! root = "Counter"
//! hash_key = "id"
//! version = 1
//!
//! [[type]]
//! name = "Counter"
//! fields = [
//!     { name = "id", type = "string" },
//!     { name = "hits", type = "number" },
//! ]
//! "#;
//!
//! let registry = recmap_schema::load_registry([source]).unwrap();
//! let schema = registry.get("counters").unwrap();
//! assert_eq!(schema.field("hits").storage, "hits");
//! ```

#![warn(missing_docs)]

mod compile;
mod schema;
mod validator;

pub use compile::{compile, load_registry, load_table, SchemaLoadError};
pub use schema::{
    parse_field_kind, FieldConfig, IndexConfig, SchemaFile, TableConfig, TypeConfig,
};
pub use validator::{validate_schema, ValidationError};
