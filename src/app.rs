//! The main application logic, decoupled from the entry point.

use crate::{
    collectors::{CommandGitClient, RepositoryCollector, SysinfoProbe, SystemCollector},
    config::Config,
    core::{GitClient, ResourceProbe},
    internal_metrics::{
        server::{MetricsServer, ServerError},
        MetricRegistry,
    },
    task_manager::TaskManager,
};
use anyhow::{anyhow, bail, Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    metrics_addr: SocketAddr,
    server: JoinHandle<Result<(), ServerError>>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the metrics server is bound to.
    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
    }

    /// Runs until `signal` resolves or the metrics server stops.
    ///
    /// The server stopping on its own is an error; the collectors are shut
    /// down in both cases.
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let early_exit = tokio::select! {
            biased;
            _ = signal => {
                info!("Shutdown signal received. Shutting down gracefully...");
                None
            }
            result = &mut self.server => Some(result),
        };

        self.task_manager.shutdown().await;

        match early_exit {
            None => server_outcome(self.server.await),
            Some(result) => {
                server_outcome(result)?;
                bail!("metrics server stopped unexpectedly")
            }
        }
    }
}

fn server_outcome(result: Result<Result<(), ServerError>, JoinError>) -> Result<()> {
    match result {
        Ok(outcome) => outcome.map_err(Into::into),
        Err(e) => Err(anyhow!("metrics server task panicked: {}", e)),
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// replace the external sources.
pub struct AppBuilder {
    config: Config,
    git_override: Option<Arc<dyn GitClient>>,
    probe_override: Option<Box<dyn ResourceProbe>>,
    listen_address_override: Option<SocketAddr>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            git_override: None,
            probe_override: None,
            listen_address_override: None,
        }
    }

    /// Overrides the git client for testing.
    pub fn git_override(mut self, git: Arc<dyn GitClient>) -> Self {
        self.git_override = Some(git);
        self
    }

    /// Overrides the resource probe for testing.
    pub fn probe_override(mut self, probe: Box<dyn ResourceProbe>) -> Self {
        self.probe_override = Some(probe);
        self
    }

    pub fn listen_address(mut self, addr: SocketAddr) -> Self {
        self.listen_address_override = Some(addr);
        self
    }

    /// Binds the metrics server and starts the collectors.
    ///
    /// Failing to bind the listener is returned as an error.
    #[instrument(skip_all)]
    pub async fn build(self) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new();
        let registry = Arc::new(MetricRegistry::new());

        let listen_address = self
            .listen_address_override
            .unwrap_or(config.server.listen_address);
        let server = MetricsServer::bind(listen_address, registry.handle(), task_manager.subscribe())
            .await?;
        let metrics_addr = server
            .local_addr()
            .context("failed to get local address for metrics server")?;

        if config.repository.enabled {
            let git = self.git_override.unwrap_or_else(|| {
                Arc::new(CommandGitClient::new(config.repository.git_binary.clone())) as Arc<dyn GitClient>
            });
            let collector =
                RepositoryCollector::new(git, registry.clone(), config.repository.clone());
            task_manager.spawn("RepositoryCollector", collector.run(task_manager.subscribe()));
        } else {
            debug!("Repository collector disabled.");
        }

        if config.system.enabled {
            let probe = self
                .probe_override
                .unwrap_or_else(|| Box::new(SysinfoProbe::new()) as Box<dyn ResourceProbe>);
            let collector = SystemCollector::new(probe, registry.clone(), config.system.clone());
            task_manager.spawn("SystemCollector", collector.run(task_manager.subscribe()));
        } else {
            debug!("System collector disabled.");
        }

        let server = tokio::spawn(server.run());

        Ok(App {
            task_manager,
            metrics_addr,
            server,
        })
    }
}
