//! In-memory module toolchain backed by artifact files in a temp directory.

use async_trait::async_trait;
use modproxy_core::{ArtifactKind, ModuleInfo, ResolvedModule};
use modproxy_toolchain::{ModuleToolchain, ToolchainError, ToolchainResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::Barrier;

#[derive(Default)]
struct FakeModule {
    /// Versions in the order the toolchain reports them.
    versions: Vec<(String, Option<OffsetDateTime>)>,
    /// Movable queries (branches, `latest`) mapped to concrete versions.
    aliases: HashMap<String, String>,
}

/// A [`ModuleToolchain`] that knows a fixed set of modules.
///
/// Artifacts are written under `root/<module>/@v/` when a version is added,
/// mirroring the layout of a real module cache.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct FakeToolchain {
    root: PathBuf,
    modules: HashMap<String, FakeModule>,
    barrier: Option<Arc<Barrier>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modules: HashMap::new(),
            barrier: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Register a module that exists but has no tagged versions.
    pub fn with_module(mut self, module: &str) -> Self {
        self.modules.entry(module.to_string()).or_default();
        self
    }

    /// Add a version of `module` and write its artifacts to disk.
    pub fn with_version(
        mut self,
        module: &str,
        version: &str,
        time: Option<OffsetDateTime>,
    ) -> Self {
        let dir = self.version_dir(module);
        std::fs::create_dir_all(&dir).expect("Failed to create artifact directory");

        let info = ModuleInfo {
            version: version.to_string(),
            time,
        };
        std::fs::write(
            self.artifact_path(module, version, ArtifactKind::Info),
            info.to_json().expect("Failed to encode info"),
        )
        .expect("Failed to write info");
        std::fs::write(
            self.artifact_path(module, version, ArtifactKind::Mod),
            go_mod_contents(module),
        )
        .expect("Failed to write go.mod");
        std::fs::write(
            self.artifact_path(module, version, ArtifactKind::Zip),
            zip_contents(module, version),
        )
        .expect("Failed to write zip");

        self.modules
            .entry(module.to_string())
            .or_default()
            .versions
            .push((version.to_string(), time));
        self
    }

    /// Make `query` resolve to `version`, like a branch name would.
    pub fn with_alias(mut self, module: &str, query: &str, version: &str) -> Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .aliases
            .insert(query.to_string(), version.to_string());
        self
    }

    /// Hold every call until `barrier` releases, so a test can tell whether
    /// requests are served concurrently.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn artifact_path(&self, module: &str, version: &str, kind: ArtifactKind) -> PathBuf {
        self.version_dir(module)
            .join(format!("{version}.{}", kind.extension()))
    }

    /// Number of toolchain calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn version_dir(&self, module: &str) -> PathBuf {
        self.root.join(module).join("@v")
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
    }

    fn module(&self, operation: &'static str, module: &str) -> ToolchainResult<&FakeModule> {
        self.modules.get(module).ok_or_else(|| ToolchainError::Module {
            operation,
            module: module.to_string(),
            message: format!("reading {module}/@v/list: 404 Not Found"),
        })
    }

    fn lookup(
        &self,
        operation: &'static str,
        module: &str,
        query: &str,
    ) -> ToolchainResult<(String, Option<OffsetDateTime>)> {
        let entry = self.module(operation, module)?;
        let target = match entry.aliases.get(query) {
            Some(version) => Some(version.as_str()),
            None if query == "latest" => entry.versions.last().map(|(v, _)| v.as_str()),
            None => Some(query),
        };

        target
            .and_then(|target| entry.versions.iter().find(|(v, _)| v == target))
            .cloned()
            .ok_or_else(|| ToolchainError::Module {
                operation,
                module: format!("{module}@{query}"),
                message: format!("unknown revision {query}"),
            })
    }
}

#[async_trait]
impl ModuleToolchain for FakeToolchain {
    async fn resolve_and_download(
        &self,
        module: &str,
        query: &str,
    ) -> ToolchainResult<ResolvedModule> {
        self.enter().await;
        let (version, time) = self.lookup("download", module, query)?;
        Ok(ResolvedModule {
            path: module.to_string(),
            info: self.artifact_path(module, &version, ArtifactKind::Info),
            go_mod: self.artifact_path(module, &version, ArtifactKind::Mod),
            zip: self.artifact_path(module, &version, ArtifactKind::Zip),
            version,
            time,
        })
    }

    async fn list_versions(&self, module: &str) -> ToolchainResult<Vec<String>> {
        self.enter().await;
        let entry = self.module("list", module)?;
        Ok(entry.versions.iter().map(|(v, _)| v.clone()).collect())
    }

    async fn resolve(&self, module: &str, query: &str) -> ToolchainResult<ModuleInfo> {
        self.enter().await;
        let (version, time) = self.lookup("resolve", module, query)?;
        Ok(ModuleInfo { version, time })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn go_mod_contents(module: &str) -> String {
    format!("module {module}\n\ngo 1.21\n")
}

/// Deterministic archive bytes, large enough to span several stream chunks.
pub fn zip_contents(module: &str, version: &str) -> Vec<u8> {
    let seed = format!("{module}@{version}");
    seed.bytes().cycle().take(200 * 1024).collect()
}

#[allow(dead_code)]
pub fn remove_file(path: &Path) {
    std::fs::remove_file(path).expect("Failed to remove artifact");
}
