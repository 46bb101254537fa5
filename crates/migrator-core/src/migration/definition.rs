//! Migration definitions and their textual form.

use crate::error::{Error, Result};
use crate::patch::{Change, Patch};
use crate::resource::{ObjectKey, TypeDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Which objects a migration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetDescriptor {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    /// Absent or empty for a fleet migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TargetDescriptor {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::new(&self.group, &self.version, &self.kind)
    }

    /// Key of the single target object; the name is empty for fleets.
    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, self.name.clone().unwrap_or_default())
    }

    /// True when the migration applies to every object of the type.
    pub fn is_fleet(&self) -> bool {
        self.name.as_deref().map_or(true, str::is_empty)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fleet() {
            write!(f, "{} in namespace {:?}", self.kind, self.namespace)
        } else {
            write!(f, "{} {}", self.kind, self.object_key())
        }
    }
}

/// A named, versioned pair of patch lists.
#[derive(Debug, Clone)]
pub struct Migration {
    pub name: String,
    /// File the definition came from; diagnostics only.
    pub filename: PathBuf,
    pub target: TargetDescriptor,
    pub up: Vec<Patch>,
    pub down: Vec<Patch>,
}

impl Migration {
    pub fn new(name: impl Into<String>, target: TargetDescriptor) -> Self {
        Self {
            name: name.into(),
            filename: PathBuf::new(),
            target,
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    pub fn with_up(mut self, patches: Vec<Patch>) -> Self {
        self.up = patches;
        self
    }

    pub fn with_down(mut self, patches: Vec<Patch>) -> Self {
        self.down = patches;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = filename.into();
        self
    }
}

/// Textual form of a migration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationSpec {
    pub name: String,
    pub target: TargetDescriptor,
    pub up: Vec<PatchSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub down: Vec<PatchSpec>,
}

impl MigrationSpec {
    /// Decode every patch payload into its typed form.
    pub fn into_migration(self, filename: impl Into<PathBuf>) -> Result<Migration> {
        Ok(Migration {
            name: self.name,
            filename: filename.into(),
            target: self.target,
            up: decode_all(self.up)?,
            down: decode_all(self.down)?,
        })
    }
}

fn decode_all(specs: Vec<PatchSpec>) -> Result<Vec<Patch>> {
    specs.into_iter().map(Patch::try_from).collect()
}

/// Textual form of a patch: a `type` tag plus exactly one payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
    #[serde(rename = "type")]
    pub patch_type: String,
    /// Structural or merge payload, as a JSON string or an inline value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Value>,
    /// Expression payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cel: Option<Vec<Change>>,
}

/// Patch mechanic named by a `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Structural,
    Merge,
    Expression,
}

impl PatchKind {
    /// Resolve a `type` tag, accepting the media-type aliases.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "structural" | "json" | "application/json-patch+json" => Ok(PatchKind::Structural),
            "merge" | "application/merge-patch+json" => Ok(PatchKind::Merge),
            "expression" | "cel" => Ok(PatchKind::Expression),
            other => Err(Error::UnknownPatchType(other.to_string())),
        }
    }
}

impl TryFrom<PatchSpec> for Patch {
    type Error = Error;

    fn try_from(spec: PatchSpec) -> Result<Self> {
        let kind = PatchKind::parse(&spec.patch_type)?;
        let decode_error = |message: &str| Error::PatchDecode {
            patch_type: spec.patch_type.clone(),
            message: message.to_string(),
        };

        match (kind, spec.change, spec.cel) {
            (_, Some(_), Some(_)) => Err(decode_error("both change and cel are set")),
            (PatchKind::Expression, None, Some(changes)) => Ok(Patch::Expression(changes)),
            (PatchKind::Expression, _, None) => Err(decode_error("missing cel payload")),
            (_, None, _) => Err(decode_error("missing change payload")),
            (PatchKind::Structural, Some(change), None) => {
                let document = payload(change).map_err(|m| decode_error(&m))?;
                let operations =
                    serde_json::from_value(document).map_err(|e| decode_error(&e.to_string()))?;
                Ok(Patch::Structural(operations))
            }
            (PatchKind::Merge, Some(change), None) => {
                let document = payload(change).map_err(|m| decode_error(&m))?;
                if !document.is_object() {
                    return Err(decode_error("merge payload must be an object"));
                }
                Ok(Patch::Merge(document))
            }
        }
    }
}

/// A string payload holds serialised JSON (or YAML); anything else is used
/// as-is.
fn payload(change: Value) -> std::result::Result<Value, String> {
    match change {
        Value::String(text) => serde_json::from_str(&text)
            .or_else(|_| serde_yaml::from_str(&text))
            .map_err(|e: serde_yaml::Error| e.to_string()),
        other => Ok(other),
    }
}
