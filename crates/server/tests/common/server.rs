//! Server test utilities.

use super::toolchain::FakeToolchain;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use bytes::Bytes;
use modproxy_core::config::AppConfig;
use modproxy_server::{AppState, create_router};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub toolchain: Arc<FakeToolchain>,
    _temp_dir: TempDir,
}

/// A fully buffered response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("Response body is not UTF-8")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server whose toolchain is populated by `build`.
    pub fn new(build: impl FnOnce(FakeToolchain) -> FakeToolchain) -> Self {
        Self::with_config(|_| {}, build)
    }

    /// Like [`TestServer::new`], with a hook to adjust the configuration.
    pub fn with_config(
        configure: impl FnOnce(&mut AppConfig),
        build: impl FnOnce(FakeToolchain) -> FakeToolchain,
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing(temp_dir.path().join("modcache"));
        configure(&mut config);

        let toolchain = Arc::new(build(FakeToolchain::new(temp_dir.path().join("artifacts"))));

        modproxy_server::metrics::register_metrics();

        let state = AppState::new(config, toolchain.clone());
        let router = create_router(state.clone());

        Self {
            router,
            state,
            toolchain,
            _temp_dir: temp_dir,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri).await
    }

    pub async fn request(&self, method: Method, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
