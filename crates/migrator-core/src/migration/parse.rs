//! Reading migration definitions from YAML and JSON files.

use super::definition::{Migration, MigrationSpec};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Parse one YAML migration document.
///
/// `filename` is recorded on the migration and used in error messages.
pub fn parse_str(text: &str, filename: impl Into<PathBuf>) -> Result<Migration> {
    let filename = filename.into();
    let spec: MigrationSpec = serde_yaml::from_str(text).map_err(|e| {
        let location = e.location();
        Error::Parse {
            file: filename.clone(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
            message: e.to_string(),
        }
    })?;
    decode(spec, filename)
}

/// Parse one JSON migration document.
pub fn parse_json_str(text: &str, filename: impl Into<PathBuf>) -> Result<Migration> {
    let filename = filename.into();
    let spec: MigrationSpec = serde_json::from_str(text).map_err(|e| Error::Parse {
        file: filename.clone(),
        line: Some(e.line()),
        column: Some(e.column()),
        message: e.to_string(),
    })?;
    decode(spec, filename)
}

fn decode(spec: MigrationSpec, filename: PathBuf) -> Result<Migration> {
    let name = spec.name.clone();
    let target = spec.target.to_string();
    spec.into_migration(filename.clone())
        .map_err(|source| Error::Migration {
            migration: name,
            filename,
            target,
            source: Box::new(source),
        })
}

/// Read and parse a single migration file, choosing the decoder by
/// extension.
pub fn parse_file(path: &Path) -> Result<Migration> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json_str(&text, path),
        _ => parse_str(&text, path),
    }
}

/// Parse every `.yaml`, `.yml` and `.json` file in `dir`, in file name
/// order. Other entries are ignored.
pub fn parse_directory(dir: &Path) -> Result<Vec<Migration>> {
    let io_error = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_migration = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
        if is_migration {
            files.push(path);
        }
    }
    files.sort();

    debug!(dir = %dir.display(), count = files.len(), "Parsing migrations");
    files.iter().map(|path| parse_file(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use pretty_assertions::assert_eq;
    use std::fs;

    const SERVICE_MIGRATION: &str = r#"
name: patch-service
target:
  version: v1
  kind: Service
  namespace: default
  name: testing
up:
  - type: application/json-patch+json
    change: |
      [{"op": "replace", "path": "/spec/ports/0/port", "value": 81}]
down:
  - type: structural
    change:
      - op: replace
        path: /spec/ports/0/port
        value: 80
"#;

    #[test]
    fn test_parse_yaml() {
        let migration = parse_str(SERVICE_MIGRATION, "0001_service.yaml").unwrap();
        assert_eq!(migration.name, "patch-service");
        assert_eq!(migration.filename, PathBuf::from("0001_service.yaml"));
        assert_eq!(migration.target.kind, "Service");
        assert_eq!(migration.target.name.as_deref(), Some("testing"));
        assert!(matches!(migration.up.as_slice(), [Patch::Structural(_)]));
        assert!(matches!(migration.down.as_slice(), [Patch::Structural(_)]));
    }

    #[test]
    fn test_parse_expression_yaml() {
        let text = r#"
name: migrate-configmap
target: {version: v1, kind: ConfigMap, namespace: default}
up:
  - type: expression
    cel:
      - key: data.testing
        newValue: "'migrated'"
"#;
        let migration = parse_str(text, "cm.yaml").unwrap();
        assert!(migration.target.is_fleet());
        assert!(migration.down.is_empty());
        assert!(matches!(migration.up.as_slice(), [Patch::Expression(c)] if c.len() == 1));
    }

    #[test]
    fn test_parse_error_has_location() {
        let text = "name: broken\ntarget:\n  kind: [unclosed\n";
        let err = parse_str(text, "broken.yaml").unwrap_err();
        match err {
            Error::Parse { file, line, .. } => {
                assert_eq!(file, PathBuf::from("broken.yaml"));
                assert!(line.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_patch_type_names_file() {
        let text = r#"
name: bad-type
target: {version: v1, kind: ConfigMap, namespace: default, name: test-cm}
up:
  - type: strategic
    change: "{}"
"#;
        let err = parse_str(text, "bad.yaml").unwrap_err();
        assert!(matches!(err.root(), Error::UnknownPatchType(t) if t == "strategic"));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_parse_json() {
        let text = r#"{
  "name": "json-migration",
  "target": {"version": "v1", "kind": "ConfigMap", "namespace": "default"},
  "up": [{"type": "merge", "change": {"data": {"testing": "merged"}}}]
}"#;
        let migration = parse_json_str(text, "m.json").unwrap();
        assert!(matches!(migration.up.as_slice(), [Patch::Merge(_)]));
    }

    #[test]
    fn test_parse_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let migration = |name: &str| {
            format!("name: {name}\ntarget: {{version: v1, kind: ConfigMap, namespace: default}}\nup: []\n")
        };
        fs::write(dir.path().join("0002_second.yml"), migration("second")).unwrap();
        fs::write(dir.path().join("0001_first.yaml"), migration("first")).unwrap();
        fs::write(dir.path().join("README.md"), "not a migration").unwrap();

        let migrations = parse_directory(dir.path()).unwrap();
        let names: Vec<_> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_parse_directory_missing() {
        let err = parse_directory(Path::new("/nonexistent/migrations")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().starts_with("reading /nonexistent/migrations"));
    }
}
