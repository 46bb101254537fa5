//! Output formatters for change records.

use clap::ValueEnum;
use migrator_core::MigrationChange;
use serde_json::Value;

/// Output format for change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per change
    Text,
    /// JSON array
    Json,
    /// YAML sequence
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a list of change records.
    fn format_changes(&self, changes: &[MigrationChange]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Yaml => Box::new(YamlFormatter),
    }
}

/// Records with the diff decoded, so structured formats nest it rather
/// than quoting it.
fn records(changes: &[MigrationChange]) -> Vec<Value> {
    changes
        .iter()
        .map(|change| {
            let diff = serde_json::from_str(&change.diff)
                .unwrap_or_else(|_| Value::String(change.diff.clone()));
            serde_json::json!({
                "migration": change.migration,
                "target": change.target,
                "typeDescriptor": change.type_descriptor,
                "diff": diff,
            })
        })
        .collect()
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_changes(&self, changes: &[MigrationChange]) -> String {
        if changes.is_empty() {
            return "No changes".to_string();
        }
        changes
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_changes(&self, changes: &[MigrationChange]) -> String {
        serde_json::to_string_pretty(&records(changes)).unwrap_or_else(|_| "[]".to_string())
    }
}

pub struct YamlFormatter;

impl Formatter for YamlFormatter {
    fn format_changes(&self, changes: &[MigrationChange]) -> String {
        serde_yaml::to_string(&records(changes)).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_core::{ObjectKey, TypeDescriptor};

    fn change() -> MigrationChange {
        MigrationChange {
            migration: "patch-service-port".to_string(),
            target: ObjectKey::new("default", "testing"),
            type_descriptor: TypeDescriptor::new("", "v1", "Service"),
            diff: r#"{"spec":{"ports":[{"port":81}]}}"#.to_string(),
        }
    }

    #[test]
    fn test_text_format() {
        let output = TextFormatter.format_changes(&[change()]);
        assert_eq!(
            output,
            r#"patch-service-port: v1, Kind=Service default/testing {"spec":{"ports":[{"port":81}]}}"#
        );
        assert_eq!(TextFormatter.format_changes(&[]), "No changes");
    }

    #[test]
    fn test_json_nests_diff() {
        let output = JsonFormatter.format_changes(&[change()]);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["diff"]["spec"]["ports"][0]["port"], 81);
        assert_eq!(parsed[0]["target"]["name"], "testing");
        assert_eq!(parsed[0]["typeDescriptor"]["kind"], "Service");
    }

    #[test]
    fn test_yaml_format() {
        let output = YamlFormatter.format_changes(&[change()]);
        assert!(output.contains("migration: patch-service-port"));
        assert!(output.contains("port: 81"));
    }
}
