//! Application state shared across handlers.

use modproxy_core::config::AppConfig;
use modproxy_toolchain::ModuleToolchain;
use std::sync::Arc;

/// Shared application state.
///
/// Read-only after construction; handlers never lock anything, so requests
/// for unrelated modules proceed independently.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Module toolchain the proxy resolves against.
    pub toolchain: Arc<dyn ModuleToolchain>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, toolchain: Arc<dyn ModuleToolchain>) -> Self {
        Self {
            config: Arc::new(config),
            toolchain,
        }
    }

    /// The configured mount prefix, e.g. `/mod/`.
    pub fn mount_prefix(&self) -> &str {
        &self.config.server.mount_prefix
    }
}
