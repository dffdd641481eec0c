//! Toolchain trait definitions.

use crate::error::ToolchainResult;
use async_trait::async_trait;
use modproxy_core::{ModuleInfo, ResolvedModule};

/// The capability the proxy needs from a module toolchain.
///
/// Implementations may take seconds to minutes per call (network and VCS
/// round-trips) and must be safe to call concurrently for unrelated modules.
/// Module paths and queries passed in are unescaped.
#[async_trait]
pub trait ModuleToolchain: Send + Sync + 'static {
    /// Resolve `query` for `module` and make sure its `.info`, `.mod` and
    /// `.zip` artifacts exist in durable storage.
    async fn resolve_and_download(&self, module: &str, query: &str)
    -> ToolchainResult<ResolvedModule>;

    /// List the versions the toolchain can discover, in no particular order.
    async fn list_versions(&self, module: &str) -> ToolchainResult<Vec<String>>;

    /// Resolve `query` for `module` to a concrete version without downloading it.
    async fn resolve(&self, module: &str, query: &str) -> ToolchainResult<ModuleInfo>;

    /// Resolve the `latest` query.
    async fn resolve_latest(&self, module: &str) -> ToolchainResult<ModuleInfo> {
        self.resolve(module, "latest").await
    }

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
