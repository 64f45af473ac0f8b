//! Configuration management for repowatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, an optional TOML file,
//! `REPOWATCH_`-prefixed environment variables, and command-line flags.

use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The default logging filter, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Configuration for the metrics HTTP server.
    pub server: ServerConfig,
    /// Configuration for the repository sampler.
    pub repository: RepositoryConfig,
    /// Configuration for the system resource sampler.
    pub system: SystemConfig,
}

/// Configuration for the metrics HTTP server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address the `/metrics` endpoint listens on.
    pub listen_address: SocketAddr,
}

/// Configuration for the repository sampler.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RepositoryConfig {
    pub enabled: bool,
    /// Seconds between two samples.
    pub interval_seconds: u64,
    /// Name of the environment variable holding the repository path.
    /// It is read on every tick.
    pub path_env: String,
    /// Value of the `repository` label.
    pub label: String,
    /// The git executable to invoke.
    pub git_binary: String,
}

/// Configuration for the system resource sampler.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    pub enabled: bool,
    /// Seconds between two samples.
    pub interval_seconds: u64,
    /// Window over which CPU usage is averaged, in milliseconds.
    pub cpu_window_ms: u64,
}

impl RepositoryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl SystemConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }
}

impl Config {
    /// Loads the configuration from all sources, with the CLI taking precedence.
    pub fn load_from_cli(cli: Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            // Allow overriding with environment variables, e.g., REPOWATCH_SYSTEM__INTERVAL_SECONDS=5
            .merge(Env::prefixed("REPOWATCH_").split("__"))
            .merge(cli)
            .extract()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.repository.interval_seconds == 0 {
            bail!("repository.interval_seconds must be greater than zero");
        }
        if self.system.interval_seconds == 0 {
            bail!("system.interval_seconds must be greater than zero");
        }
        if self.system.cpu_window_ms == 0 {
            bail!("system.cpu_window_ms must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 9090)),
            },
            repository: RepositoryConfig {
                enabled: true,
                interval_seconds: 300,
                path_env: "REPO_PATH".to_string(),
                label: "repo-info".to_string(),
                git_binary: "git".to_string(),
            },
            system: SystemConfig {
                enabled: true,
                interval_seconds: 15,
                cpu_window_ms: 1000,
            },
        }
    }
}

/// Loads variables from an env file into the process environment.
///
/// A missing or unreadable file is an error; the caller treats it as fatal.
pub fn load_env_file(path: &Path) -> Result<()> {
    dotenv::from_path(path)
        .with_context(|| format!("failed to load env file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_exporter_constants() {
        let config = Config::default();
        assert_eq!(config.server.listen_address.port(), 9090);
        assert_eq!(config.repository.interval(), Duration::from_secs(300));
        assert_eq!(config.repository.label, "repo-info");
        assert_eq!(config.repository.path_env, "REPO_PATH");
        assert_eq!(config.system.interval(), Duration::from_secs(15));
        assert_eq!(config.system.cpu_window(), Duration::from_secs(1));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        config.system.interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cpu_window_is_rejected() {
        let mut config = Config::default();
        config.system.cpu_window_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cpu_window_ms"), "{err:#}");
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let err = load_env_file(Path::new("/nonexistent/repowatch/.env")).unwrap_err();
        assert!(err.to_string().contains("failed to load env file"));
    }
}
