//! repowatch - git commit and host resource exporter for Prometheus.

use clap::Parser;
use repowatch::{
    app::App,
    cli::Cli,
    config::{self, Config},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Logs a startup failure and terminates the process.
fn fatal(err: anyhow::Error) -> ! {
    // Logging may not be configured yet when the env file or config fails.
    init_tracing("info");
    error!("{:#}", err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The env file must be loaded before the config so its variables are visible.
    if let Err(err) = config::load_env_file(&cli.env_file) {
        fatal(err);
    }

    let config = Config::load_from_cli(cli).unwrap_or_else(|err| fatal(err));
    init_tracing(&config.log_level);

    info!("repowatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!(
        "Repository Collector: {} (every {}s, path from ${}, label {:?})",
        if config.repository.enabled { "Enabled" } else { "Disabled" },
        config.repository.interval_seconds,
        config.repository.path_env,
        config.repository.label
    );
    info!(
        "System Collector: {} (every {}s, CPU window {}ms)",
        if config.system.enabled { "Enabled" } else { "Disabled" },
        config.system.interval_seconds,
        config.system.cpu_window_ms
    );
    info!("-------------------------------------------------------");

    let app = App::builder(config).build().await.unwrap_or_else(|err| fatal(err));
    info!("Serving metrics on http://{}/metrics", app.metrics_addr());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(err) = app.run_until(shutdown).await {
        fatal(err);
    }
    info!("All tasks shut down. Exiting.");
}
