//! Lightweight in-process metrics.
//!
//! Atomics behind `DashMap` label sets, rendered as Prometheus text by the
//! `/metrics` handler.

pub mod metrics;

pub use metrics::FlowMetrics;
