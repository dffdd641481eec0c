//! Module proxy protocol handlers.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{observe_toolchain, record_request};
use crate::state::AppState;
use crate::streaming::ArtifactBody;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use modproxy_core::{ArtifactKind, Endpoint, ModuleRef, route};
use percent_encoding::percent_decode_str;

const NO_STORE: &str = "no-store";

/// Label for requests that never matched an endpoint.
const UNMATCHED: &str = "unmatched";

/// Fallback handler serving everything below the mount prefix.
///
/// Proxy URLs embed arbitrary module paths, so they are routed here rather
/// than through axum path patterns.
pub async fn proxy_fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let (label, result) = match parse_request(&state, &method, &uri) {
        Ok(endpoint) => {
            let head = method == Method::HEAD;
            (endpoint.label(), serve(&state, endpoint, head).await)
        }
        Err(e) => (UNMATCHED, Err(e)),
    };

    let response = result.unwrap_or_else(|e| {
        tracing::debug!(path = %uri.path(), code = e.code(), error = %e, "proxy request rejected");
        e.into_response()
    });
    record_request(label, response.status());
    response
}

fn parse_request(state: &AppState, method: &Method, uri: &Uri) -> ApiResult<Endpoint> {
    let path = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|_| ApiError::bad_request())?;
    let endpoint = route(&path, state.mount_prefix())?;

    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::bad_request());
    }
    Ok(endpoint)
}

async fn serve(state: &AppState, endpoint: Endpoint, head: bool) -> ApiResult<Response> {
    match endpoint {
        Endpoint::ListVersions { module } => list_versions(state, &module).await,
        Endpoint::Latest { module } => latest(state, &module).await,
        Endpoint::Artifact { module, kind } => artifact(state, &module, kind, head).await,
    }
}

/// GET MODULE/@v/list - Known versions, one per line.
async fn list_versions(state: &AppState, module: &str) -> ApiResult<Response> {
    tracing::info!(module, "list");
    let versions = observe_toolchain("list", state.toolchain.list_versions(module)).await?;

    let body: String = versions.iter().map(|v| format!("{v}\n")).collect();
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, NO_STORE),
        ],
        body,
    )
        .into_response())
}

/// GET MODULE/@latest - Info object for the latest version.
async fn latest(state: &AppState, module: &str) -> ApiResult<Response> {
    tracing::info!(module, "latest");
    let info = observe_toolchain("latest", state.toolchain.resolve_latest(module)).await?;

    let body = info
        .to_json()
        .map_err(|e| ApiError::Internal(format!("failed to encode info: {e}")))?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json"), (CACHE_CONTROL, NO_STORE)],
        body,
    )
        .into_response())
}

/// GET MODULE/@v/VERSION.{info,mod,zip} - Stream a downloaded artifact.
///
/// HEAD still resolves and opens the artifact so status and headers match GET.
async fn artifact(
    state: &AppState,
    module: &ModuleRef,
    kind: ArtifactKind,
    head: bool,
) -> ApiResult<Response> {
    tracing::info!("{kind} {module}");
    let resolved = observe_toolchain(
        "download",
        state
            .toolchain
            .resolve_and_download(&module.path, &module.query),
    )
    .await?;

    let path = resolved.artifact(kind);
    let body = ArtifactBody::open(path).await.map_err(|e| {
        tracing::error!(
            module = %module,
            path = %path.display(),
            error = %e,
            "failed to open downloaded artifact"
        );
        ApiError::Internal(format!("failed to open {kind} for {module}: {e}"))
    })?;

    let size = body.size().to_string();
    let mut response = (
        StatusCode::OK,
        [
            (CONTENT_TYPE, kind.content_type()),
            (CONTENT_LENGTH, size.as_str()),
        ],
        if head { Body::empty() } else { body.into_body() },
    )
        .into_response();

    // A movable query (branch, commit prefix, "latest") must not be cached
    // under the name it was requested by.
    if !resolved.is_exact(&module.query) {
        let info = resolved.info();
        tracing::info!(time = ?info.time, "{kind} {module} => {}", info.version);
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    }

    Ok(response)
}
