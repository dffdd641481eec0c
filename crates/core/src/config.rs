//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix the proxy protocol is mounted under. Must start and end with `/`.
    /// Clients point `GOPROXY` at `http://<host><mount_prefix without trailing slash>`.
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_mount_prefix() -> String {
    "/mod/".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            mount_prefix: default_mount_prefix(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Parse the bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        self.bind
            .parse()
            .map_err(|e| format!("invalid bind address {:?}: {e}", self.bind))
    }

    /// Validate server configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr()?;
        if !self.mount_prefix.starts_with('/') || !self.mount_prefix.ends_with('/') {
            return Err(format!(
                "server.mount_prefix must start and end with '/', got {:?}",
                self.mount_prefix
            ));
        }
        Ok(())
    }
}

/// Module toolchain configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// The `go` executable, looked up on `PATH` if not absolute.
    #[serde(default = "default_go_binary")]
    pub go_binary: PathBuf,
    /// Directory used as both `GOMODCACHE` and `GOCACHE` for every invocation.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// `GOPROXY` value passed to the toolchain (default: "direct", i.e. fetch from VCS).
    #[serde(default = "default_upstream")]
    pub upstream: String,
    /// Kill a toolchain invocation after this many seconds. Unbounded if unset.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

fn default_go_binary() -> PathBuf {
    PathBuf::from("go")
}

fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("gomodproxy-cache")
}

fn default_upstream() -> String {
    "direct".to_string()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go_binary: default_go_binary(),
            cache_dir: default_cache_dir(),
            upstream: default_upstream(),
            command_timeout_secs: None,
        }
    }
}

impl ToolchainConfig {
    /// Get the command timeout as a Duration, if configured.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Validate toolchain configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.go_binary.as_os_str().is_empty() {
            return Err("toolchain.go_binary must not be empty".to_string());
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err("toolchain.cache_dir must not be empty".to_string());
        }
        if self.upstream.trim().is_empty() {
            return Err("toolchain.upstream must not be empty".to_string());
        }
        if self.command_timeout_secs == Some(0) {
            return Err("toolchain.command_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Module toolchain configuration.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

impl AppConfig {
    /// Create a test configuration rooted at `cache_dir`.
    ///
    /// **For testing only.**
    pub fn for_testing(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig::default(),
            toolchain: ToolchainConfig {
                cache_dir: cache_dir.into(),
                ..Default::default()
            },
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.toolchain.validate()
    }
}
