//! Audit records produced by a migration run.

use crate::resource::{ObjectKey, TypeDescriptor};
use serde::Serialize;
use std::fmt;

/// One object changed, or that would be changed, by a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationChange {
    /// Name of the migration that produced the change.
    pub migration: String,
    pub target: ObjectKey,
    pub type_descriptor: TypeDescriptor,
    /// Merge patch turning the fetched object into the patched one.
    pub diff: String,
}

impl fmt::Display for MigrationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.migration, self.type_descriptor, self.target, self.diff
        )
    }
}
