//! Structured tracing and Prometheus metrics shared across the campaign
//! phase orchestration core.

pub mod error;
pub mod exporter;
pub mod metrics;

#[cfg(feature = "metrics-server")]
pub mod metrics_server;

pub use error::{Error, Result};
pub use exporter::init_tracing;
pub use metrics::{export_metrics, metrics_registry, MetricsRegistry};
