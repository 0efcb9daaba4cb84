use axum::{routing::get, Router};
use std::net::SocketAddr;

use crate::metrics::export_metrics;

async fn metrics_handler() -> String {
    export_metrics()
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Serve `/metrics` and `/health` on the given port, reading from the
/// process-global metrics registry (`metrics::metrics_registry`).
pub async fn serve_metrics(port: u16) -> std::io::Result<()> {
    serve_metrics_with_addr(SocketAddr::from(([0, 0, 0, 0], port))).await
}

async fn serve_metrics_with_addr(addr: SocketAddr) -> std::io::Result<()> {
    let app: Router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");
    axum::serve(listener, app).await
}
