//! # Metrics Server
//!
//! This module defines the `MetricsServer`, which runs an `axum`-based web
//! server exposing the registry to a Prometheus scraper.
//!
//! The server provides a single endpoint, `/metrics`, which returns the
//! current state of all registered metrics in the Prometheus exposition format.
//! It stops when the shutdown signal is received.

use axum::{http::header, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, trace};

/// The content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind metrics server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("metrics server failed: {0}")]
    Serve(#[source] io::Error),
}

/// A server that exposes metrics to a Prometheus scraper.
pub struct MetricsServer {
    listener: TcpListener,
    prom_handle: PrometheusHandle,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsServer {
    /// Binds the listener. Failing to bind is reported to the caller, which
    /// treats it as fatal.
    pub async fn bind(
        addr: SocketAddr,
        prom_handle: PrometheusHandle,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            prom_handle,
            shutdown_rx,
        })
    }

    /// The address the server is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until a shutdown signal is received.
    ///
    /// Returns an error only if the server itself stops unexpectedly.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let handle = self.prom_handle.clone();
        let app = Router::new().route("/metrics", get(move || render_metrics(handle.clone())));

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Metrics server listening.");
        }

        let result = tokio::select! {
            biased;
            _ = self.shutdown_rx.changed() => {
                trace!("Metrics server received shutdown signal via select.");
                Ok(())
            }
            result = axum::serve(self.listener, app.into_make_service()) => {
                result.map_err(ServerError::Serve)
            }
        };
        trace!("Metrics server task finished.");
        result
    }
}

async fn render_metrics(handle: PrometheusHandle) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], handle.render())
}
