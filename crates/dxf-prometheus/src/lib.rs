//! Prometheus metrics backend for the executor manager.
//!
//! [`PrometheusMetrics`] implements [`dxf_core::MetricsBackend`] on a private
//! registry. This crate does not serve `/metrics`; encode [`PrometheusMetrics::gather`]
//! with a [`TextEncoder`] in whatever HTTP stack the agent already runs.
//!
//! ## Metrics
//! - `dxf_executors_started_total{task_type}` - Counter
//! - `dxf_executors_exited_total{task_type}` - Counter
//! - `dxf_available_slots` - Gauge
//! - `dxf_preempted_executors_total` - Counter
//! - `dxf_executor_start_failures_total{task_type, reason}` - Counter
//! - `dxf_meta_recover_failures_total` - Counter
mod backend;
pub use backend::{MetricsError, PrometheusMetrics};

pub use prometheus::{Encoder, Registry, TextEncoder};
