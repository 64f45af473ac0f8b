//! # Internal Metrics Module
//!
//! This module owns the metric instruments exported by repowatch.
//!
//! ## Components:
//!
//! - **`MetricRegistry`**: Wraps a `PrometheusRecorder` that is *not* installed
//!   as the global recorder. It is created once at startup and shared by `Arc`
//!   with both samplers and the HTTP server.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   that exposes the `/metrics` endpoint for Prometheus to scrape.

use crate::core::{CommitInfo, ResourceSample};
use metrics::Gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub mod server;

pub const GIT_COMMIT_INFO: &str = "git_commit_info";
pub const SYSTEM_CPU_USAGE: &str = "system_cpu_usage";
pub const SYSTEM_MEMORY_USAGE: &str = "system_memory_usage";

/// The process-wide set of instruments.
///
/// Gauge handles are atomic, so samplers update them without locking and the
/// server renders them concurrently.
pub struct MetricRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    cpu_usage: Gauge,
    memory_usage: Gauge,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry").finish_non_exhaustive()
    }
}

impl MetricRegistry {
    /// Creates the registry and registers descriptions for all metrics.
    ///
    /// The two scalar gauges are registered immediately, so they are rendered
    /// with a value of 0 before the first sample is taken.
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let (cpu_usage, memory_usage) = metrics::with_local_recorder(&recorder, || {
            metrics::describe_gauge!(GIT_COMMIT_INFO, "Git commit information");
            metrics::describe_gauge!(SYSTEM_CPU_USAGE, "Current CPU usage percentage");
            metrics::describe_gauge!(SYSTEM_MEMORY_USAGE, "Current memory usage percentage");
            (
                metrics::gauge!(SYSTEM_CPU_USAGE),
                metrics::gauge!(SYSTEM_MEMORY_USAGE),
            )
        });

        Self {
            recorder,
            handle,
            cpu_usage,
            memory_usage,
        }
    }

    /// Publishes a commit observation as a `git_commit_info` series set to 1.
    ///
    /// Each distinct label set is its own series; earlier commits stay exported.
    pub fn record_commit(&self, repository: &str, info: &CommitInfo) {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::gauge!(
                GIT_COMMIT_INFO,
                "repository" => repository.to_string(),
                "hash" => info.hash.clone(),
                "author" => info.author.clone(),
                "timestamp" => info.timestamp.clone(),
                "branch" => info.branch.clone(),
                "message" => info.message.clone()
            )
            .set(1.0);
        });
    }

    /// Overwrites both resource gauges.
    pub fn record_resources(&self, sample: ResourceSample) {
        self.cpu_usage.set(sample.cpu_percent);
        self.memory_usage.set(sample.memory_used_percent);
    }

    /// Renders every registered instrument in the text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Returns a handle that can render this registry from another task.
    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
