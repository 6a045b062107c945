//! Main healthcheck server implementation.

use crate::config::Config;
use crate::http_server::{AppState, HealthServer};
use crate::metrics::MetricsRegistry;
use crate::probes;
use healthcheck::{Category, HealthService, Registry};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Healthcheck server
pub struct HealthcheckServer {
    config: Config,
    registry: Arc<Registry>,
}

impl HealthcheckServer {
    /// Create a server and register the probes declared in `config`
    pub fn new(config: Config) -> common::Result<Self> {
        Self::with_registry(config, Arc::new(Registry::new()))
    }

    /// Create a server on top of a registry the embedding application
    /// may already have populated with its own probes.
    pub fn with_registry(config: Config, registry: Arc<Registry>) -> common::Result<Self> {
        probes::register_all(&registry, &config.probes)?;

        for category in Category::ALL {
            info!(
                %category,
                probes = registry.len(category),
                "Probes registered"
            );
        }

        Ok(Self { config, registry })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Shared handler state built from this server's registry and config
    pub fn state(&self) -> AppState {
        AppState {
            service: HealthService::new(
                self.registry.clone(),
                self.config.engine.to_engine_config(),
            ),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> common::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> common::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting healthcheck server");

        let server = HealthServer::new(self.state(), self.config.server.listen_addr.clone());
        server.run(shutdown).await?;

        info!("Healthcheck server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
