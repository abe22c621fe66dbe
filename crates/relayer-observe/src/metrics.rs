//! Prometheus metrics registry and the liveness-check HTTP surface.
//!
//! Serving the `/metrics` and `/health/readiness` endpoints over HTTP is the
//! only piece of wire plumbing this crate takes on; the registry and the
//! liveness contract are otherwise plain library code any caller can use
//! without an HTTP server at all.

use std::{net::SocketAddr, sync::Arc};

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use prometheus::{Encoder, Registry, TextEncoder};

static REGISTRY: std::sync::OnceLock<Registry> = std::sync::OnceLock::new();

/// Initializes the global Prometheus registry. `prefix` namespaces every
/// metric registered through it afterwards (e.g. `"relayer"` yields
/// `relayer_orders_created`); `registry` lets a caller supply one already in
/// use (tests, embedding into a larger process) instead of a fresh default.
/// Safe to call at most once per process - later calls are ignored.
pub fn setup_registry(prefix: Option<String>, registry: Option<Registry>) {
    let registry = registry.unwrap_or_else(|| {
        Registry::new_custom(prefix, None).unwrap_or_default()
    });
    let _ = REGISTRY.set(registry);
}

/// The registry every `prometheus_metric_storage::MetricStorage` type in
/// this workspace registers its collectors into.
pub fn get_storage_registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// A component whose health can be summarized as a single boolean, exposed
/// on the `/health/readiness` endpoint.
#[async_trait::async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

async fn metrics_handler() -> impl IntoResponse {
    let registry = get_storage_registry();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%err, "failed to encode metrics");
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (axum::http::StatusCode::OK, String::from_utf8_lossy(&buffer).into_owned())
}

async fn readiness_handler(State(liveness): State<Arc<dyn LivenessChecking>>) -> impl IntoResponse {
    if liveness.is_alive().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Spawns the metrics/liveness HTTP server in the background and returns its
/// `JoinHandle`. Callers that don't need to observe the server exiting can
/// drop the handle; callers that want to notice a crash can `.await` it
/// alongside their other long-running futures.
pub fn serve_metrics(liveness: Arc<dyn LivenessChecking>, addr: SocketAddr) -> tokio::task::JoinHandle<std::io::Result<()>> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health/readiness", get(readiness_handler))
        .with_state(liveness);

    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await
    })
}
