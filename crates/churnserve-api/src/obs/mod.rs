//! Lightweight in-process metrics.
//!
//! Metrics are stored as atomics, owned by `AppState` and rendered by the
//! `/metrics` handler in Prometheus text format. No global registry.

pub mod metrics;

pub use metrics::{Outcome, ServiceMetrics};
