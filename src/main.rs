//! Azure subscription cost report endpoint.
//!
//! An Azure Functions custom handler: a plain HTTP server that the function
//! host fronts, listening on the port it hands us. Each request is an
//! independent, stateless pipeline — authenticate, query costs and tags
//! concurrently, normalize, join, aggregate, respond.

use std::{sync::Arc, time::Duration};

use reqwest::Client;

mod azure;
mod config;
mod error;
mod observability;
mod params;
mod report;
mod routes;
mod validation;

#[cfg(test)]
mod tests;

use config::AppConfig;

/// Outbound request budget for each upstream call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared per-process state: configuration and one pooled HTTP client.
#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        // One client for all outbound calls; reqwest pools connections
        // per host internally.
        let http_client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "cost report endpoint listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM so in-flight reports can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => tracing::error!(%error, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
