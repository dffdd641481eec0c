//! Toolchain backend that drives the `go` command.
//!
//! Each request runs one `go` invocation:
//! - `go mod download -json MODULE@QUERY` for the artifact endpoints,
//! - `go list -m -json -versions MODULE` for the version list,
//! - `go list -m -json MODULE@QUERY` for query resolution (`@latest`).
//!
//! The `go` command keeps its own module cache under the configured cache
//! directory, so repeated downloads of an exact version are served from disk.

use crate::error::{ToolchainError, ToolchainResult};
use crate::traits::ModuleToolchain;
use async_trait::async_trait;
use modproxy_core::config::ToolchainConfig;
use modproxy_core::{ModuleInfo, ResolvedModule};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::fs;
use tokio::process::Command;
use tracing::instrument;

/// Variables copied from the server's own environment. Everything else is
/// dropped before the child starts.
const INHERITED_ENV: [&str; 3] = ["USER", "PATH", "HOME"];

/// Module toolchain backed by the `go` command.
pub struct GoToolchain {
    go_binary: PathBuf,
    cache_dir: PathBuf,
    upstream: String,
    timeout: Option<Duration>,
}

impl GoToolchain {
    /// Create a new go toolchain, creating the cache directory if needed.
    pub async fn new(config: &ToolchainConfig) -> ToolchainResult<Self> {
        fs::create_dir_all(&config.cache_dir).await?;
        // GOMODCACHE must be absolute.
        let cache_dir = fs::canonicalize(&config.cache_dir).await?;

        Ok(Self {
            go_binary: config.go_binary.clone(),
            cache_dir,
            upstream: config.upstream.clone(),
            timeout: config.command_timeout(),
        })
    }

    /// The absolute cache directory handed to the toolchain.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Environment for a toolchain invocation, constructed from scratch.
    ///
    /// `NETRC` is emptied so the child cannot read the server user's
    /// credentials, and `GOSUMDB` is emptied so no checksum database is
    /// consulted on the proxy's behalf.
    fn command_env(&self) -> Vec<(&'static str, OsString)> {
        let mut env: Vec<(&'static str, OsString)> = INHERITED_ENV
            .iter()
            .map(|key| (*key, std::env::var_os(key).unwrap_or_default()))
            .collect();
        env.extend([
            ("NETRC", OsString::new()),
            ("GOPROXY", OsString::from(&self.upstream)),
            ("GOCACHE", self.cache_dir.clone().into_os_string()),
            ("GOMODCACHE", self.cache_dir.clone().into_os_string()),
            ("GOSUMDB", OsString::new()),
        ]);
        env
    }

    /// Run the go command in a scratch directory and decode its JSON output.
    async fn run_go<T>(&self, args: &[&str]) -> ToolchainResult<T>
    where
        T: DeserializeOwned + GoJson,
    {
        // Removed on drop, whichever way this function returns.
        let workdir = tempfile::tempdir()?;
        let command = format!("{} {}", self.go_binary.display(), args.join(" "));

        let mut cmd = Command::new(&self.go_binary);
        cmd.args(args)
            .current_dir(workdir.path())
            .env_clear()
            .envs(self.command_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ToolchainError::Command {
            command: command.clone(),
            status: format!("spawn failed: {e}"),
            stderr: String::new(),
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ToolchainError::Timeout {
                    command: command.clone(),
                    secs: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            // `go mod download -json` exits non-zero but still describes
            // module errors on stdout; prefer that message when present.
            if let Ok(result) = serde_json::from_slice::<T>(&output.stdout)
                && result.error_message().is_some()
            {
                return Ok(result);
            }

            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(command = %command, status = %output.status, "go command failed");
            return Err(ToolchainError::Command {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|source| ToolchainError::Decode { command, source })
    }
}

#[async_trait]
impl ModuleToolchain for GoToolchain {
    #[instrument(skip(self), fields(backend = "go"))]
    async fn resolve_and_download(
        &self,
        module: &str,
        query: &str,
    ) -> ToolchainResult<ResolvedModule> {
        let target = format!("{module}@{query}");
        let download: ModuleDownloadJson =
            self.run_go(&["mod", "download", "-json", &target]).await?;

        if let Some(message) = download.error_message() {
            return Err(ToolchainError::Module {
                operation: "download",
                module: module.to_string(),
                message: message.to_string(),
            });
        }

        let time = read_info_time(&download.info).await;
        Ok(ResolvedModule {
            path: if download.path.is_empty() {
                module.to_string()
            } else {
                download.path
            },
            version: download.version,
            time,
            info: download.info,
            go_mod: download.go_mod,
            zip: download.zip,
        })
    }

    #[instrument(skip(self), fields(backend = "go"))]
    async fn list_versions(&self, module: &str) -> ToolchainResult<Vec<String>> {
        let list: ModuleListJson = self
            .run_go(&["list", "-m", "-json", "-versions", module])
            .await?;

        if let Some(message) = list.error_message() {
            return Err(ToolchainError::Module {
                operation: "list",
                module: module.to_string(),
                message: message.to_string(),
            });
        }
        Ok(list.versions)
    }

    #[instrument(skip(self), fields(backend = "go"))]
    async fn resolve(&self, module: &str, query: &str) -> ToolchainResult<ModuleInfo> {
        let target = format!("{module}@{query}");
        let list: ModuleListJson = self.run_go(&["list", "-m", "-json", &target]).await?;

        if let Some(message) = list.error_message() {
            return Err(ToolchainError::Module {
                operation: "list",
                module: module.to_string(),
                message: message.to_string(),
            });
        }
        tracing::debug!(path = %list.path, version = %list.version, "resolved {query}");
        Ok(ModuleInfo {
            version: list.version,
            time: list.time,
        })
    }

    fn name(&self) -> &'static str {
        "go"
    }
}

/// Best-effort read of the timestamp recorded in a downloaded `.info` file.
async fn read_info_time(path: &Path) -> Option<OffsetDateTime> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not read .info file");
            return None;
        }
    };
    serde_json::from_slice::<ModuleInfo>(&data)
        .ok()
        .and_then(|info| info.time)
}

// -- JSON schemas of go command output --

/// Output types that can carry a module-level error.
trait GoJson {
    fn error_message(&self) -> Option<&str>;
}

/// Output of `go mod download -json` (see `go help mod download`).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ModuleDownloadJson {
    path: String,
    version: String,
    error: String,
    /// Absolute path to the cached `.info` file.
    info: PathBuf,
    /// Absolute path to the cached `.mod` file.
    go_mod: PathBuf,
    /// Absolute path to the cached `.zip` file.
    zip: PathBuf,
}

impl GoJson for ModuleDownloadJson {
    fn error_message(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }
}

/// Output of `go list -m -json` (see `go help list`).
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ModuleListJson {
    path: String,
    version: String,
    versions: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    time: Option<OffsetDateTime>,
    error: Option<ModuleErrorJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ModuleErrorJson {
    err: String,
}

impl GoJson for ModuleListJson {
    fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.err.as_str())
    }
}
