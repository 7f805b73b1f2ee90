//! # recmap-migrate
//!
//! Lazy schema migrations for [`recmap`](https://docs.rs/recmap) records.
//!
//! When a table's record shape evolves, already-stored records keep their
//! old shape. This crate upgrades them at read time:
//!
//! 1. Every stored record carries a stamped schema-version attribute
//!    (absent means version 0).
//! 2. On read, the stamp is compared against the table's current version.
//! 3. While the stamp trails, registered [`Migration`] steps run in order —
//!    v1→v2→v3, never skipping — rewriting the raw attribute map in place.
//! 4. Once caught up, each applied step's post-migration hook runs with the
//!    final version.
//!
//! Migration never rewrites the stored record: the on-disk stamp stays old
//! until the record is independently re-saved through the normal write path.
//! A missing intermediate step is a hard error ([`MigrationError::GapInChain`]),
//! never a silent skip.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod engine;

pub use engine::{
    stamped_version, Migration, MigrationContext, MigrationError, MigrationRegistry,
};
