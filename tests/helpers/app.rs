//! Test helpers for running the full application instance.

use super::{fake_git::FakeGitClient, fake_probe::FakeProbe};
use anyhow::Result;
use repowatch::{app::AppBuilder, config::Config};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::oneshot, task::JoinHandle, time::timeout};

/// A running application bound to an ephemeral local port.
pub struct TestApp {
    pub metrics_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    app_handle: JoinHandle<Result<()>>,
}

/// Builds a `TestApp` with fakes for every external source.
pub struct TestAppBuilder {
    config: Config,
    git: Arc<FakeGitClient>,
    probe: FakeProbe,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            git: Arc::new(FakeGitClient::failing()),
            probe: FakeProbe::new(0.0, 0.0),
        }
    }

    pub fn with_git(mut self, git: Arc<FakeGitClient>) -> Self {
        self.git = git;
        self
    }

    pub fn with_probe(mut self, probe: FakeProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub async fn start(self) -> Result<TestApp> {
        let app = AppBuilder::new(self.config)
            .listen_address("127.0.0.1:0".parse()?)
            .git_override(self.git)
            .probe_override(Box::new(self.probe))
            .build()
            .await?;
        let metrics_addr = app.metrics_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let app_handle = tokio::spawn(app.run_until(async {
            let _ = shutdown_rx.await;
        }));

        Ok(TestApp {
            metrics_addr,
            shutdown_tx,
            app_handle,
        })
    }
}

impl TestApp {
    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.metrics_addr)
    }

    /// Scrapes the endpoint once and returns the body.
    pub async fn scrape(&self) -> Result<String> {
        Ok(reqwest::get(self.metrics_url()).await?.text().await?)
    }

    /// Polls the endpoint until the body contains `needle`.
    pub async fn wait_for_metric(&self, needle: &str, timeout_duration: Duration) -> String {
        let start = std::time::Instant::now();
        loop {
            let body = self.scrape().await.unwrap_or_default();
            if body.contains(needle) {
                return body;
            }
            if start.elapsed() > timeout_duration {
                panic!("Timeout waiting for '{}' in metrics output:\n{}", needle, body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        timeout(timeout_duration, self.app_handle).await??
    }
}
