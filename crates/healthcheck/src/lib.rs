//! In-process health check aggregation.
//!
//! Probes are registered under a [`Category`] (startup, liveness,
//! readiness). Querying a category runs its probes concurrently, each
//! under its own timeout and in its own task, and reduces the outcomes
//! into a single UP/DOWN verdict an orchestrator can act on.
//!
//! A misbehaving probe degrades the result, never the engine: errors,
//! panics and timeouts all come back as DOWN outcomes carrying a
//! `reason` entry in their data.
//!
//! # Example
//!
//! ```no_run
//! use healthcheck::{Category, EngineConfig, FnProbe, HealthService, Registry, Report};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::new());
//! registry.register(Arc::new(FnProbe::new(
//!     "database-connection-active",
//!     Category::Readiness,
//!     || async { Ok(Report::up().with_data("pool_size", 8)) },
//! )))?;
//!
//! let service = HealthService::new(registry, EngineConfig::default());
//! let result = service.evaluate(Category::Readiness).await;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod executor;
pub mod probe;
pub mod registry;
pub mod service;
pub mod types;

pub use config::{CategoryTimeouts, EngineConfig};
pub use error::RegistryError;
pub use executor::Executor;
pub use probe::{BlockingProbe, FnProbe, Probe, predicate};
pub use registry::{Registry, Snapshot};
pub use service::HealthService;
pub use types::{AggregateResult, Category, Data, FaultKind, Outcome, Report, Status};
