//! Core protocol types and shared logic for the module proxy.
//!
//! This crate defines what every other crate agrees on:
//! - Case-escaping of module paths and versions
//! - Parsing of proxy request paths into endpoints
//! - Module references, resolution results and the `.info` schema
//! - Configuration

pub mod config;
pub mod endpoint;
pub mod error;
pub mod escape;
pub mod module;

pub use endpoint::{ArtifactKind, Endpoint, RouteError, route};
pub use error::{Error, Result};
pub use escape::{escape_path, escape_version, unescape_path, unescape_version};
pub use module::{ModuleInfo, ModuleRef, ResolvedModule};
