//! Module toolchain abstraction and backends.
//!
//! This crate provides:
//! - The [`ModuleToolchain`] capability the proxy core resolves against
//! - A backend that drives the `go` command with an isolated environment

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::go::GoToolchain;
pub use error::{ToolchainError, ToolchainResult};
pub use traits::ModuleToolchain;

use modproxy_core::config::ToolchainConfig;
use std::sync::Arc;

/// Create a module toolchain from configuration.
pub async fn from_config(config: &ToolchainConfig) -> ToolchainResult<Arc<dyn ModuleToolchain>> {
    config.validate().map_err(ToolchainError::Config)?;

    let toolchain = GoToolchain::new(config).await?;
    tracing::debug!(cache_dir = %toolchain.cache_dir().display(), "go toolchain ready");
    Ok(Arc::new(toolchain))
}
