//! repowatch - exports git commit metadata and host resource usage as
//! Prometheus metrics.
//!
//! Two collectors sample on their own intervals and write into a shared
//! `MetricRegistry`; an `axum` server renders it on `GET /metrics`.

pub mod app;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod core;
pub mod internal_metrics;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
