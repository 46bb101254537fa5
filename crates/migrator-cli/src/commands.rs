//! Subcommand implementations.

use migrator_core::lang::{DirectoryLibrary, ExpressionLibrary, StaticDirectory};
use migrator_core::{
    parse_directory, Direction, MigrationChange, Migrator, MigratorConfig, Mode, SledStore,
    StoreConfig, StoreError,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors reported by the command-line tool.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Migration(#[from] migrator_core::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Options shared by every command that touches the store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub path: PathBuf,
    pub cache_capacity_mb: u64,
}

impl StoreOptions {
    pub fn open(&self) -> Result<SledStore> {
        let config = StoreConfig::new(&self.path)
            .with_cache_capacity(self.cache_capacity_mb * 1024 * 1024)
            .with_flush_on_write(true);
        Ok(SledStore::open(config)?)
    }
}

/// Everything needed to run a set of migrations.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub migrations_dir: PathBuf,
    pub store: StoreOptions,
    pub directory: Option<PathBuf>,
}

/// Run every migration in `direction`, writing or only diffing per `mode`.
pub fn migrate(
    options: &MigrateOptions,
    direction: Direction,
    mode: Mode,
) -> Result<Vec<MigrationChange>> {
    let migrations = parse_directory(&options.migrations_dir)?;
    info!(
        count = migrations.len(),
        dir = %options.migrations_dir.display(),
        "Loaded migrations"
    );

    let mut config = MigratorConfig::new(direction, mode);
    if let Some(path) = &options.directory {
        config = config.with_library(load_directory(path)?);
    }

    let store = options.store.open()?;
    let changes = Migrator::new(&store, config).run(&migrations)?;
    store.flush()?;
    Ok(changes)
}

/// Seed the store with objects read from YAML or JSON files. A file may
/// hold several YAML documents.
pub fn import(store: &StoreOptions, files: &[PathBuf]) -> Result<usize> {
    let store = store.open()?;
    let mut imported = 0;

    for path in files {
        for value in read_documents(path)? {
            if value.is_null() {
                continue;
            }
            let resource = store.insert(value)?;
            info!(object = %resource.identity(), "Imported object");
            imported += 1;
        }
    }

    store.flush()?;
    Ok(imported)
}

fn read_documents(path: &Path) -> Result<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::Deserializer::from_str(&text)
        .map(|document| {
            serde_json::Value::deserialize(document).map_err(|e| CliError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Directory file layout: explicit entries plus an optional fallback used
/// for any other account.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryFile {
    #[serde(default)]
    entries: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    fallback: Option<BTreeMap<String, serde_json::Value>>,
}

/// Load a static account directory for `directory.lookup`.
pub fn load_directory(path: &Path) -> Result<Arc<dyn ExpressionLibrary>> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: DirectoryFile = serde_yaml::from_str(&text).map_err(|e| CliError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut directory = StaticDirectory::new();
    for (account, attributes) in &file.entries {
        directory = directory.entry(account.as_str(), attributes);
    }
    if let Some(fallback) = &file.fallback {
        directory = directory.fallback(fallback);
    }
    Ok(Arc::new(DirectoryLibrary::new(Arc::new(directory))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: testing
  namespace: default
spec:
  ports:
    - name: http-80
      port: 80
      protocol: TCP
      targetPort: 9376
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: test-cm
  namespace: default
data:
  testing: test
"#;

    const MIGRATION: &str = r#"
name: patch-service-port
target: {version: v1, kind: Service, namespace: default, name: testing}
up:
  - type: structural
    change: '[{"op": "replace", "path": "/spec/ports/0/port", "value": 81}]'
down:
  - type: structural
    change: '[{"op": "replace", "path": "/spec/ports/0/port", "value": 80}]'
"#;

    struct Workspace {
        dir: tempfile::TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("migrations")).unwrap();
            fs::write(dir.path().join("migrations/0001.yaml"), MIGRATION).unwrap();
            fs::write(dir.path().join("objects.yaml"), SERVICE).unwrap();
            Self { dir }
        }

        fn store(&self) -> StoreOptions {
            StoreOptions {
                path: self.dir.path().join("store"),
                cache_capacity_mb: 8,
            }
        }

        fn options(&self) -> MigrateOptions {
            MigrateOptions {
                migrations_dir: self.dir.path().join("migrations"),
                store: self.store(),
                directory: None,
            }
        }
    }

    #[test]
    fn test_import_then_calculate_then_apply() {
        let ws = Workspace::new();
        let imported = import(&ws.store(), &[ws.dir.path().join("objects.yaml")]).unwrap();
        assert_eq!(imported, 2);

        let pending = migrate(&ws.options(), Direction::Up, Mode::Calculate).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].diff.contains("\"port\":81"));

        let applied = migrate(&ws.options(), Direction::Up, Mode::Apply).unwrap();
        assert_eq!(applied, pending);

        let remaining = migrate(&ws.options(), Direction::Up, Mode::Calculate).unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_missing_migrations_dir() {
        let ws = Workspace::new();
        let mut options = ws.options();
        options.migrations_dir = ws.dir.path().join("absent");
        let err = migrate(&options, Direction::Up, Mode::Apply).unwrap_err();
        assert!(err.to_string().starts_with("reading "));
    }

    #[test]
    fn test_load_directory_file() {
        let ws = Workspace::new();
        let path = ws.dir.path().join("directory.yaml");
        fs::write(
            &path,
            "entries:\n  testuser@example.com:\n    guid: 27f7c407-99d7-4c5a-8ebd-206a5c2e3f3d\n",
        )
        .unwrap();
        let library = load_directory(&path).unwrap();
        assert_eq!(library.name(), "directory");
    }
}
