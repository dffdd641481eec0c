//! Prometheus metrics for the module proxy.
//!
//! Exposes request counts per endpoint, toolchain invocation latency and
//! failures, and artifact streaming errors.
//!
//! The `/metrics` endpoint is unauthenticated. It carries no module paths,
//! only aggregate counts, but should still be kept off public networks.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use modproxy_toolchain::ToolchainResult;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::future::Future;
use std::sync::{LazyLock, Once};
use std::time::Instant;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "modproxy_requests_total",
            "Total number of proxy requests by endpoint and status code",
        ),
        &["endpoint", "status"],
    )
    .expect("metric creation failed")
});

// Toolchain metrics
pub static TOOLCHAIN_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "modproxy_toolchain_duration_seconds",
            "Time spent in toolchain invocations",
        )
        // Downloads of large modules can take minutes.
        .buckets(vec![
            0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
        ]),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static TOOLCHAIN_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "modproxy_toolchain_failures_total",
            "Total number of failed toolchain invocations",
        ),
        &["operation"],
    )
    .expect("metric creation failed")
});

pub static ARTIFACT_STREAM_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "modproxy_artifact_stream_errors_total",
        "Total number of artifact bodies aborted by a read error mid-transfer",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so integration tests can build several routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REQUESTS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TOOLCHAIN_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TOOLCHAIN_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARTIFACT_STREAM_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Count a finished proxy request.
pub fn record_request(endpoint: &str, status: StatusCode) {
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
}

/// Time a toolchain call, counting it as failed if it returns an error.
pub async fn observe_toolchain<T, F>(operation: &str, call: F) -> ToolchainResult<T>
where
    F: Future<Output = ToolchainResult<T>>,
{
    let start = Instant::now();
    let result = call.await;
    TOOLCHAIN_DURATION
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    if result.is_err() {
        TOOLCHAIN_FAILURES.with_label_values(&[operation]).inc();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use modproxy_toolchain::ToolchainError;

    #[test]
    fn test_metrics_registration() {
        // This would panic if any metric creation failed
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_record_request_counts_by_label() {
        let before = REQUESTS_TOTAL.with_label_values(&["zip", "404"]).get();
        record_request("zip", StatusCode::NOT_FOUND);
        assert_eq!(
            REQUESTS_TOTAL.with_label_values(&["zip", "404"]).get(),
            before + 1
        );
    }

    #[tokio::test]
    async fn test_observe_toolchain_counts_failures() {
        let before = TOOLCHAIN_FAILURES.with_label_values(&["test-op"]).get();

        let ok: ToolchainResult<u32> = observe_toolchain("test-op", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(
            TOOLCHAIN_FAILURES.with_label_values(&["test-op"]).get(),
            before
        );

        let err: ToolchainResult<u32> = observe_toolchain("test-op", async {
            Err(ToolchainError::Config("boom".to_string()))
        })
        .await;
        assert!(err.is_err());
        assert_eq!(
            TOOLCHAIN_FAILURES.with_label_values(&["test-op"]).get(),
            before + 1
        );
        assert!(
            TOOLCHAIN_DURATION
                .with_label_values(&["test-op"])
                .get_sample_count()
                >= 2
        );
    }
}
