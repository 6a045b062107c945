//! Healthcheck server binary

use healthcheck_server::{Config, HealthcheckServer, setup_tracing};

#[tokio::main]
async fn main() -> common::Result<()> {
    // Load configuration first (needed for logging settings)
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    let _telemetry_guard = setup_tracing(&config.logging, &config.telemetry)?;

    tracing::info!(
        listen_addr = %config.server.listen_addr,
        probes = config.probes.len(),
        "Healthcheck server starting"
    );

    let server = HealthcheckServer::new(config)?;
    server.run().await?;

    // Telemetry guard will flush spans on drop

    Ok(())
}
