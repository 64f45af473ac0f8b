//! # System Metrics Collector
//!
//! This module defines the `SystemCollector`, which periodically measures
//! host CPU and memory utilization and updates the `system_cpu_usage` and
//! `system_memory_usage` gauges.
//!
//! Measurements come from a `ResourceProbe`; the production probe is backed by
//! the `sysinfo` crate.

use crate::config::SystemConfig;
use crate::core::{ResourceProbe, ResourceSample, SampleError};
use crate::internal_metrics::MetricRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// A `ResourceProbe` that reads host-wide utilization through `sysinfo`.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProbe for SysinfoProbe {
    async fn cpu_percent(&mut self, window: Duration) -> Result<f64, SampleError> {
        // CPU usage is the delta between two refreshes.
        self.system.refresh_cpu();
        time::sleep(window).await;
        self.system.refresh_cpu();

        if self.system.cpus().is_empty() {
            return Err(SampleError::CpuUnavailable("no CPUs reported".to_string()));
        }
        Ok(self.system.global_cpu_info().cpu_usage() as f64)
    }

    async fn memory_used_percent(&mut self) -> Result<f64, SampleError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SampleError::MemoryUnavailable(
                "total memory reported as zero".to_string(),
            ));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }
}

/// Keeps a measurement inside `[0, 100]`; non-finite readings are failures.
fn to_percentage(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

/// A collector for host resource utilization.
pub struct SystemCollector {
    probe: Box<dyn ResourceProbe>,
    registry: Arc<MetricRegistry>,
    config: SystemConfig,
    last: ResourceSample,
}

impl SystemCollector {
    pub fn new(
        probe: Box<dyn ResourceProbe>,
        registry: Arc<MetricRegistry>,
        config: SystemConfig,
    ) -> Self {
        Self {
            probe,
            registry,
            config,
            last: ResourceSample::default(),
        }
    }

    /// Runs one tick and returns the published sample.
    ///
    /// A failed measurement keeps the previous value of its field.
    pub async fn collect_once(&mut self) -> ResourceSample {
        let mut sample = self.last;

        match self.probe.cpu_percent(self.config.cpu_window()).await {
            Ok(value) => match to_percentage(value) {
                Some(percent) => sample.cpu_percent = percent,
                None => debug!(value, "Discarding non-finite CPU reading."),
            },
            Err(e) => debug!(error = %e, "CPU sample failed."),
        }

        match self.probe.memory_used_percent().await {
            Ok(value) => match to_percentage(value) {
                Some(percent) => sample.memory_used_percent = percent,
                None => debug!(value, "Discarding non-finite memory reading."),
            },
            Err(e) => debug!(error = %e, "Memory sample failed."),
        }

        self.registry.record_resources(sample);
        self.last = sample;
        sample
    }

    /// Runs the collection loop until a shutdown signal is received.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_seconds = self.config.interval_seconds,
            "System collector started."
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = self.collect_once() => {}
            }
        }
        info!("System collector finished.");
    }
}
