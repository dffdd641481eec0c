//! Parsing of proxy request paths into endpoints.
//!
//! The protocol defines five URL shapes below the mount point:
//!
//! - `MODULE/@v/list`
//! - `MODULE/@latest`
//! - `MODULE/@v/VERSION.info`
//! - `MODULE/@v/VERSION.mod`
//! - `MODULE/@v/VERSION.zip`
//!
//! Module paths may contain dots but never the literal `/@v/` segment, and
//! artifact extensions never contain dots, so the artifact shapes are split
//! at the last `.` and then at the first `/@v/`.

use crate::escape::{unescape_path, unescape_version};
use crate::module::ModuleRef;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const LIST_SUFFIX: &str = "/@v/list";
const LATEST_SUFFIX: &str = "/@latest";
const VERSION_SEPARATOR: &str = "/@v/";

/// Per-version artifact served by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON metadata (`.info`).
    Info,
    /// Module manifest (`.mod`).
    Mod,
    /// Source archive (`.zip`).
    Zip,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Mod => "mod",
            Self::Zip => "zip",
        }
    }

    /// `Content-Type` of the artifact body.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Info => "application/json",
            Self::Mod => "text/plain; charset=UTF-8",
            Self::Zip => "application/zip",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArtifactKind {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "mod" => Ok(Self::Mod),
            "zip" => Ok(Self::Zip),
            other => Err(RouteError::BadRequest(format!(
                "unknown artifact kind: {other}"
            ))),
        }
    }
}

/// A recognised proxy endpoint. Module paths and versions are unescaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// `MODULE/@v/list`
    ListVersions { module: String },
    /// `MODULE/@latest`
    Latest { module: String },
    /// `MODULE/@v/VERSION.{info,mod,zip}`
    Artifact { module: ModuleRef, kind: ArtifactKind },
}

/// Routing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path is outside the proxy mount point.
    #[error("not found")]
    NotFound,

    /// The path is under the mount point but is not a valid proxy request.
    #[error("{0}")]
    BadRequest(String),
}

impl From<crate::Error> for RouteError {
    fn from(err: crate::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl Endpoint {
    /// Parse a path with the mount prefix already removed.
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        if let Some(module) = path.strip_suffix(LIST_SUFFIX) {
            return Ok(Self::ListVersions {
                module: unescape_path(module)?,
            });
        }

        if let Some(module) = path.strip_suffix(LATEST_SUFFIX) {
            return Ok(Self::Latest {
                module: unescape_path(module)?,
            });
        }

        let (base, ext) = path.rsplit_once('.').ok_or_else(bad_request)?;
        let kind: ArtifactKind = ext.parse().map_err(|_| bad_request())?;
        let (module, version) = base.split_once(VERSION_SEPARATOR).ok_or_else(bad_request)?;

        Ok(Self::Artifact {
            module: ModuleRef::new(unescape_path(module)?, unescape_version(version)?),
            kind,
        })
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ListVersions { .. } => "list",
            Self::Latest { .. } => "latest",
            Self::Artifact { kind, .. } => kind.extension(),
        }
    }
}

/// Route a full request path mounted at `mount_prefix` (e.g. `/mod/`).
pub fn route(request_path: &str, mount_prefix: &str) -> Result<Endpoint, RouteError> {
    let rest = request_path
        .strip_prefix(mount_prefix)
        .ok_or(RouteError::NotFound)?;
    Endpoint::parse(rest)
}

fn bad_request() -> RouteError {
    RouteError::BadRequest("bad request".to_string())
}
