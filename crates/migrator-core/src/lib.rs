//! Migrator Core - patch engine, migration runner and object stores.
//!
//! Migrations are named pairs of patch lists (`up` and `down`) addressed at
//! configuration objects by group, version, kind, namespace and optional
//! name. The runner resolves each target, applies the patch chain to a
//! private copy, and either writes the result back (conditioned on the
//! fetched `resourceVersion`) or reports a merge-patch diff.

pub mod error;
pub mod migration;
pub mod patch;
pub mod resource;
pub mod store;

pub use error::{Error, Result};
pub use migration::{
    calculate_changes, migrate_down, migrate_up, parse_directory, parse_file, parse_str, resolve,
    Direction, Migration, MigrationChange, Migrator, MigratorConfig, Mode, TargetDescriptor,
};
pub use patch::{apply_patches, diff_string, merge_diff, Change, ExpressionEvaluator, Patch, PatchEngine};
pub use resource::{ObjectKey, Resource, TypeDescriptor};
pub use store::{MemoryStore, ObjectStore, SledStore, StoreConfig, StoreError};

/// Re-export of the expression language.
pub use migrator_lang as lang;
