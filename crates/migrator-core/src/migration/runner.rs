//! Migration runner: resolve targets, patch them, and write or diff the
//! results.

use super::change::MigrationChange;
use super::definition::Migration;
use super::resolver::resolve;
use crate::error::{Error, Result};
use crate::patch::{diff, Patch, PatchEngine};
use crate::resource::Resource;
use crate::store::{ObjectStore, StoreError};
use migrator_lang::ExpressionLibrary;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Which patch list of a migration to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// The patches a migration defines for this direction.
    pub fn patches<'m>(&self, migration: &'m Migration) -> &'m [Patch] {
        match self {
            Direction::Up => &migration.up,
            Direction::Down => &migration.down,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not a valid migration direction")]
pub struct InvalidDirection(pub String);

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

/// Whether patched objects are written back or only diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Write changed objects to the store.
    #[default]
    Apply,
    /// Compute diffs without writing.
    Calculate,
}

/// Runner configuration.
#[derive(Clone, Default)]
pub struct MigratorConfig {
    pub direction: Direction,
    pub mode: Mode,
    /// Extension libraries available to expression patches.
    pub libraries: Vec<Arc<dyn ExpressionLibrary>>,
}

impl fmt::Debug for MigratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorConfig")
            .field("direction", &self.direction)
            .field("mode", &self.mode)
            .field(
                "libraries",
                &self.libraries.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl MigratorConfig {
    pub fn new(direction: Direction, mode: Mode) -> Self {
        Self {
            direction,
            mode,
            libraries: Vec::new(),
        }
    }

    pub fn with_library(mut self, library: Arc<dyn ExpressionLibrary>) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_libraries(mut self, libraries: Vec<Arc<dyn ExpressionLibrary>>) -> Self {
        self.libraries.extend(libraries);
        self
    }
}

/// Runs migrations against a store, one target at a time.
pub struct Migrator<'s> {
    store: &'s dyn ObjectStore,
    direction: Direction,
    mode: Mode,
    engine: PatchEngine,
}

impl<'s> Migrator<'s> {
    pub fn new(store: &'s dyn ObjectStore, config: MigratorConfig) -> Self {
        Self {
            store,
            direction: config.direction,
            mode: config.mode,
            engine: PatchEngine::new(config.libraries),
        }
    }

    /// Run `migrations` in order, stopping at the first failure.
    ///
    /// Objects a migration leaves unchanged produce no record and, in
    /// apply mode, are not written.
    pub fn run(&self, migrations: &[Migration]) -> Result<Vec<MigrationChange>> {
        let mut changes = Vec::new();
        for migration in migrations {
            changes.extend(self.run_migration(migration)?);
        }
        Ok(changes)
    }

    /// Run a single migration over every target it resolves to.
    pub fn run_migration(&self, migration: &Migration) -> Result<Vec<MigrationChange>> {
        info!(
            migration = %migration.name,
            direction = %self.direction,
            mode = ?self.mode,
            "Running migration"
        );

        let targets = resolve(self.store, &migration.target)
            .map_err(|e| with_context(migration, migration.target.to_string(), e))?;

        let mut changes = Vec::new();
        for resource in targets {
            let identity = resource.identity();
            if let Some(change) = self
                .migrate_target(migration, resource)
                .map_err(|e| with_context(migration, identity, e))?
            {
                changes.push(change);
            }
        }

        info!(
            migration = %migration.name,
            changed = changes.len(),
            "Migration finished"
        );
        Ok(changes)
    }

    fn migrate_target(
        &self,
        migration: &Migration,
        resource: Resource,
    ) -> Result<Option<MigrationChange>> {
        debug!(target = %resource.identity(), "Patching target");

        let before = resource.to_value();
        let after = self
            .engine
            .apply(&before, self.direction.patches(migration))?;
        if before == after {
            debug!(target = %resource.identity(), "Target unchanged");
            return Ok(None);
        }

        let diff = diff::diff_string(&before, &after);
        let updated = Resource::from_value(after)?;
        let same_identity = updated.type_descriptor() == resource.type_descriptor()
            && updated.key() == resource.key();
        if !same_identity {
            return Err(Error::IdentityChanged {
                target: resource.type_descriptor(),
                key: resource.key(),
                found: updated.identity(),
            });
        }

        let change = MigrationChange {
            migration: migration.name.clone(),
            target: resource.key(),
            type_descriptor: resource.type_descriptor(),
            diff,
        };

        if self.mode == Mode::Apply {
            self.store
                .patch(&updated, resource.resource_version())
                .map_err(|e| match e {
                    StoreError::Conflict { .. } => Error::Conflict {
                        target: resource.type_descriptor(),
                        key: resource.key(),
                    },
                    other => Error::Store(other),
                })?;
            debug!(target = %resource.identity(), "Target written");
        }

        Ok(Some(change))
    }
}

fn with_context(migration: &Migration, target: String, source: Error) -> Error {
    Error::Migration {
        migration: migration.name.clone(),
        filename: migration.filename.clone(),
        target,
        source: Box::new(source),
    }
}

/// Apply the `up` patches of every migration.
pub fn migrate_up(
    store: &dyn ObjectStore,
    migrations: &[Migration],
    libraries: Vec<Arc<dyn ExpressionLibrary>>,
) -> Result<Vec<MigrationChange>> {
    let config = MigratorConfig::new(Direction::Up, Mode::Apply).with_libraries(libraries);
    Migrator::new(store, config).run(migrations)
}

/// Apply the `down` patches of every migration.
pub fn migrate_down(
    store: &dyn ObjectStore,
    migrations: &[Migration],
    libraries: Vec<Arc<dyn ExpressionLibrary>>,
) -> Result<Vec<MigrationChange>> {
    let config = MigratorConfig::new(Direction::Down, Mode::Apply).with_libraries(libraries);
    Migrator::new(store, config).run(migrations)
}

/// Compute the changes `direction` would make, without writing.
pub fn calculate_changes(
    store: &dyn ObjectStore,
    migrations: &[Migration],
    direction: Direction,
    libraries: Vec<Arc<dyn ExpressionLibrary>>,
) -> Result<Vec<MigrationChange>> {
    let config = MigratorConfig::new(direction, Mode::Calculate).with_libraries(libraries);
    Migrator::new(store, config).run(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::TargetDescriptor;
    use crate::patch::Change;
    use crate::resource::{ObjectKey, TypeDescriptor};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "test-cm", "namespace": "default"},
                "data": {"testing": "test", "tested": "this-value"}
            }))
            .unwrap();
        store
    }

    fn migration() -> Migration {
        Migration::new(
            "migrate-cm",
            TargetDescriptor::new("", "v1", "ConfigMap", "default").with_name("test-cm"),
        )
        .with_up(vec![Patch::Expression(vec![Change::new(
            "data.testing",
            "'migrated'",
        )])])
        .with_down(vec![Patch::Expression(vec![Change::new(
            "data.testing",
            "'test'",
        )])])
        .with_filename("0001_cm.yaml")
    }

    fn fetch(store: &MemoryStore) -> Resource {
        store
            .get(
                &TypeDescriptor::new("", "v1", "ConfigMap"),
                &ObjectKey::new("default", "test-cm"),
            )
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert_eq!(err.to_string(), "sideways is not a valid migration direction");
    }

    #[test]
    fn test_apply_writes_and_reports() {
        let store = store();
        let version = fetch(&store).resource_version().map(str::to_string);

        let changes = migrate_up(&store, &[migration()], Vec::new()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].diff, r#"{"data":{"testing":"migrated"}}"#);

        let stored = fetch(&store);
        assert_eq!(stored.as_object()["data"]["testing"], json!("migrated"));
        assert_ne!(stored.resource_version().map(str::to_string), version);
    }

    #[test]
    fn test_calculate_does_not_write() {
        let store = store();
        let changes =
            calculate_changes(&store, &[migration()], Direction::Up, Vec::new()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target, ObjectKey::new("default", "test-cm"));
        assert_eq!(fetch(&store).as_object()["data"]["testing"], json!("test"));
    }

    #[test]
    fn test_unchanged_target_is_not_written() {
        let store = store();
        let version = fetch(&store).resource_version().map(str::to_string);

        let changes = migrate_down(&store, &[migration()], Vec::new()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(fetch(&store).resource_version().map(str::to_string), version);
    }

    #[test]
    fn test_error_carries_context() {
        let store = store();
        let broken = migration().with_up(vec![Patch::Expression(vec![Change::new(
            "data.testing",
            "52",
        )])]);
        let err = migrate_up(&store, &[broken], Vec::new()).unwrap_err();
        match &err {
            Error::Migration {
                migration, target, ..
            } => {
                assert_eq!(migration, "migrate-cm");
                assert_eq!(target, "ConfigMap default/test-cm");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root(), Error::EvaluationType { .. }));
        assert!(err.to_string().contains("0001_cm.yaml"));
    }

    #[test]
    fn test_identity_change_rejected() {
        let store = store();
        let version = fetch(&store).resource_version().map(str::to_string);

        for field in ["metadata.name", "metadata.namespace", "kind"] {
            let renaming = migration().with_up(vec![Patch::Expression(vec![Change::new(
                field,
                "'renamed'",
            )])]);
            for mode in [Mode::Apply, Mode::Calculate] {
                let config = MigratorConfig::new(Direction::Up, mode);
                let err = Migrator::new(&store, config)
                    .run(&[renaming.clone()])
                    .unwrap_err();
                assert!(
                    matches!(err.root(), Error::IdentityChanged { key, .. }
                        if key == &ObjectKey::new("default", "test-cm")),
                    "{field}: {err}"
                );
            }
        }

        let stored = fetch(&store);
        assert_eq!(stored.as_object()["data"]["testing"], json!("test"));
        assert_eq!(stored.resource_version().map(str::to_string), version);
    }
}
