//! Healthcheck server
//!
//! Embeds the `healthcheck` engine in a standalone process: probes are
//! declared in YAML, evaluated on demand and exposed over HTTP for
//! container orchestrators.
//!
//! # Components
//!
//! - **Config**: YAML configuration with validation
//! - **Probes**: TCP, HTTP and DNS probes built from config
//! - **HTTP server**: `/health`, `/health/started`, `/health/live`,
//!   `/health/ready` and `/metrics`
//! - **Metrics**: Prometheus counters and histograms per probe and category
//! - **Telemetry**: stdout logging with optional OTLP span export

pub mod config;
pub mod http_server;
pub mod metrics;
pub mod probes;
pub mod server;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use http_server::{AppState, HealthServer, router};
pub use metrics::MetricsRegistry;
pub use server::HealthcheckServer;
pub use telemetry::{TelemetryGuard, setup_tracing};
