//! # Repository Collector
//!
//! Publishes the latest commit of a local git repository as the
//! `git_commit_info` gauge. The repository path is read from an environment
//! variable on every tick, so it can change while the process runs.

use crate::config::RepositoryConfig;
use crate::core::{CommitInfo, GitClient, GitQuery};
use crate::internal_metrics::MetricRegistry;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Runs git queries as child processes.
#[derive(Debug, Clone)]
pub struct CommandGitClient {
    binary: String,
}

impl CommandGitClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CommandGitClient {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl GitClient for CommandGitClient {
    async fn query(&self, repo_path: &str, query: GitQuery) -> String {
        let output = Command::new(&self.binary)
            .arg("-C")
            .arg(repo_path)
            .args(query.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                if !output.status.success() {
                    debug!(?query, status = %output.status, "git query exited unsuccessfully");
                }
                // stdout is used even on failure; it is usually empty then.
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Err(e) => {
                debug!(?query, error = %e, "failed to run git");
                String::new()
            }
        }
    }
}

/// Samples the latest commit on a fixed interval.
pub struct RepositoryCollector {
    git: Arc<dyn GitClient>,
    registry: Arc<MetricRegistry>,
    config: RepositoryConfig,
}

impl RepositoryCollector {
    pub fn new(
        git: Arc<dyn GitClient>,
        registry: Arc<MetricRegistry>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            git,
            registry,
            config,
        }
    }

    /// Runs one tick: queries git and publishes the observation.
    ///
    /// Always publishes, even when both queries fail.
    pub async fn collect_once(&self) -> CommitInfo {
        let repo_path = std::env::var(&self.config.path_env).unwrap_or_default();
        debug!(repo_path = %repo_path, "Sampling repository.");

        let log_record = self.git.query(&repo_path, GitQuery::LatestCommit).await;
        let branch = self.git.query(&repo_path, GitQuery::CurrentBranch).await;

        let info = CommitInfo::from_git_output(&log_record, &branch);
        self.registry.record_commit(&self.config.label, &info);
        info
    }

    /// Runs the collection loop until a shutdown signal is received.
    ///
    /// The first sample is taken immediately.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_seconds = self.config.interval_seconds,
            path_env = %self.config.path_env,
            "Repository collector started."
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
                info = self.collect_once() => {
                    debug!(hash = %info.hash, branch = %info.branch, "Published commit info.");
                }
            }
        }
        info!("Repository collector finished.");
    }
}
