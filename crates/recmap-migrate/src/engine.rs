use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use recmap::{AttrValue, RawItem, TableSchema};

/// Context handed to every migration callback.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext<'a> {
    /// Logical table name being read.
    pub table: &'a str,
    /// Root record type being migrated.
    pub record_type: &'a str,
}

/// A single migration step upgrading a record's raw representation to
/// `target_version`.
///
/// Steps form a linear chain per record type: v0→v1, v1→v2, etc. Each step
/// must be deterministic — the same stored record must migrate identically
/// on every reader.
pub trait Migration: Send + Sync {
    /// The version this step upgrades to. The step runs when a record is
    /// stamped at `target_version() - 1`.
    fn target_version(&self) -> u32;

    /// Rewrite the raw representation in place.
    fn migrate(
        &self,
        item: &mut RawItem,
        from_version: u32,
        ctx: &MigrationContext<'_>,
    ) -> Result<(), MigrationError>;

    /// Hook run after the whole chain has caught up, with the final version.
    fn post_migration(
        &self,
        _item: &mut RawItem,
        _final_version: u32,
        _ctx: &MigrationContext<'_>,
    ) -> Result<(), MigrationError> {
        Ok(())
    }
}

/// Error during migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// The version chain has a gap: no step registered for `missing`.
    GapInChain {
        /// Record type whose chain is incomplete.
        record_type: String,
        /// Target version with no registered step.
        missing: u32,
    },
    /// The stamped version is newer than the table's current version.
    FutureVersion {
        /// Version found on the stored record.
        found: u32,
        /// Current code-level version.
        current: u32,
    },
    /// A migration step failed.
    StepFailed {
        /// Version the step started from.
        from: u32,
        /// Version the step was upgrading to.
        to: u32,
        /// Step-reported reason.
        reason: String,
    },
    /// A step found the raw representation malformed.
    InvalidItem(String),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GapInChain {
                record_type,
                missing,
            } => write!(f, "{record_type}: missing migration step for v{missing}"),
            Self::FutureVersion { found, current } => {
                write!(f, "record version v{found} is newer than current v{current}")
            }
            Self::StepFailed { from, to, reason } => {
                write!(f, "migration v{from}->v{to} failed: {reason}")
            }
            Self::InvalidItem(msg) => write!(f, "invalid raw item: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MigrationError {}

/// Ordered table of migration steps, keyed by record type.
///
/// Steps are registered before any read of older-versioned data; reads then
/// upgrade lazily: while the stamped version trails the table's current
/// version, the step targeting `stamped + 1` runs, until caught up. The
/// stored record is never rewritten — the stamped version on disk stays old
/// until the record is re-saved through the normal write path.
///
/// # Example
///
/// ```
/// use recmap::{AttrValue, FieldDefinition, FieldKind, RawItem, TableSchema,
///              TypeDefinition};
/// use recmap_migrate::{Migration, MigrationContext, MigrationError, MigrationRegistry};
///
/// struct RenameAlias;
///
/// impl Migration for RenameAlias {
///     fn target_version(&self) -> u32 {
///         2
///     }
///     fn migrate(
///         &self,
///         item: &mut RawItem,
///         _from: u32,
///         _ctx: &MigrationContext<'_>,
///     ) -> Result<(), MigrationError> {
///         item.insert("alias".into(), AttrValue::from("renamed"));
///         Ok(())
///     }
/// }
///
/// let schema = TableSchema::builder("docs", "Doc", "id")
///     .version(2)
///     .types(vec![TypeDefinition::new(
///         "Doc",
///         vec![
///             FieldDefinition::new("id", FieldKind::String),
///             FieldDefinition::new("alias", FieldKind::String),
///         ],
///     )])
///     .build()
///     .unwrap();
///
/// let mut registry = MigrationRegistry::new();
/// registry.register("Doc", Box::new(RenameAlias));
///
/// let mut item = RawItem::new();
/// item.insert("id".into(), AttrValue::from("d1"));
/// item.insert("_schv".into(), AttrValue::from(1i64));
///
/// registry.run_to_current(&schema, &mut item).unwrap();
/// assert_eq!(item["alias"], AttrValue::from("renamed"));
/// ```
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<String, Vec<Box<dyn Migration>>>,
}

impl MigrationRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration step for a record type.
    pub fn register(&mut self, record_type: impl Into<String>, step: Box<dyn Migration>) {
        let steps = self.steps.entry(record_type.into()).or_default();
        steps.push(step);
        // Keep sorted by target version for efficient lookup
        steps.sort_by_key(|s| s.target_version());
    }

    /// Registered (record type, target version) pairs.
    #[must_use]
    pub fn registered_steps(&self) -> Vec<(&str, u32)> {
        self.steps
            .iter()
            .flat_map(|(ty, steps)| steps.iter().map(move |s| (ty.as_str(), s.target_version())))
            .collect()
    }

    /// Check that the chain for `record_type` is complete from
    /// `min_version + 1` up to `current_version`.
    pub fn validate_chain(
        &self,
        record_type: &str,
        min_version: u32,
        current_version: u32,
    ) -> Result<(), MigrationError> {
        let mut version = min_version;
        while version < current_version {
            if self.step_for(record_type, version + 1).is_none() {
                return Err(MigrationError::GapInChain {
                    record_type: String::from(record_type),
                    missing: version + 1,
                });
            }
            version += 1;
        }
        Ok(())
    }

    /// Whether a record stamped at `stamped_version` needs migration to
    /// reach `current_version`.
    #[must_use]
    pub fn needs_migration(stamped_version: u32, current_version: u32) -> bool {
        stamped_version != current_version
    }

    /// Bring a raw item up to the schema's current version, in place.
    ///
    /// A missing stamped-version attribute means version 0 (pre-versioning
    /// data). When the table disables migrations, the item is left untouched
    /// and no version checking happens. Returns the number of steps applied.
    pub fn run_to_current(
        &self,
        schema: &TableSchema,
        item: &mut RawItem,
    ) -> Result<u32, MigrationError> {
        if !schema.migrations_enabled() {
            return Ok(0);
        }

        let record_type = &schema.root_type().name;
        let current = schema.version();
        let mut version = stamped_version(schema, item);

        if version == current {
            return Ok(0);
        }
        if version > current {
            return Err(MigrationError::FutureVersion {
                found: version,
                current,
            });
        }

        let ctx = MigrationContext {
            table: schema.table_name(),
            record_type: record_type.as_str(),
        };

        let mut applied: Vec<&dyn Migration> = Vec::new();
        while version < current {
            let step = self.step_for(record_type, version + 1).ok_or_else(|| {
                MigrationError::GapInChain {
                    record_type: record_type.clone(),
                    missing: version + 1,
                }
            })?;

            step.migrate(item, version, &ctx)
                .map_err(|e| MigrationError::StepFailed {
                    from: version,
                    to: step.target_version(),
                    reason: e.to_string(),
                })?;

            applied.push(step);
            version = step.target_version();
        }

        for step in &applied {
            step.post_migration(item, current, &ctx)
                .map_err(|e| MigrationError::StepFailed {
                    from: step.target_version(),
                    to: current,
                    reason: e.to_string(),
                })?;
        }

        Ok(applied.len() as u32)
    }

    fn step_for(&self, record_type: &str, target: u32) -> Option<&dyn Migration> {
        self.steps
            .get(record_type)?
            .iter()
            .find(|s| s.target_version() == target)
            .map(Box::as_ref)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("steps", &self.registered_steps())
            .finish()
    }
}

/// Read the stamped schema version off a raw item (absent means 0).
#[must_use]
pub fn stamped_version(schema: &TableSchema, item: &RawItem) -> u32 {
    item.get(schema.schema_version_attr())
        .and_then(AttrValue::as_i64)
        .map(|v| v.max(0) as u32)
        .unwrap_or(0)
}
