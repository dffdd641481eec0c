//! Module references, resolution results and the `.info` JSON schema.

use crate::endpoint::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// A module path paired with a version query, both unescaped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    /// Module path, e.g. `github.com/BurntSushi/toml`.
    pub path: String,
    /// Exact version (`v1.2.3`) or a query such as `latest` or a branch name.
    pub query: String,
}

impl ModuleRef {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.query)
    }
}

/// Metadata served by the `.info` and `@latest` endpoints.
///
/// Field names follow the protocol (`Version`, `Time`); a missing time is
/// encoded as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleInfo {
    pub version: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub time: Option<OffsetDateTime>,
}

impl ModuleInfo {
    /// Encode as the compact JSON body sent to clients.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A version query resolved to a concrete version with its artifacts on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedModule {
    pub path: String,
    /// The concrete version the query resolved to.
    pub version: String,
    pub time: Option<OffsetDateTime>,
    /// Location of the `.info` file.
    pub info: PathBuf,
    /// Location of the `.mod` file.
    pub go_mod: PathBuf,
    /// Location of the `.zip` archive.
    pub zip: PathBuf,
}

impl ResolvedModule {
    /// Whether `query` named this exact version rather than a movable reference.
    pub fn is_exact(&self, query: &str) -> bool {
        self.version == query
    }

    /// Local file holding the given artifact.
    pub fn artifact(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Info => &self.info,
            ArtifactKind::Mod => &self.go_mod,
            ArtifactKind::Zip => &self.zip,
        }
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            version: self.version.clone(),
            time: self.time,
        }
    }
}
