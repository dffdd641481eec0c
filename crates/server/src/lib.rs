//! HTTP server for the Go module proxy protocol.
//!
//! This crate provides the HTTP surface:
//! - Version listing and latest-version lookup
//! - `.info`, `.mod` and `.zip` artifact streaming
//! - Health and Prometheus endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod streaming;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
