//! Engine configuration.

use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-category timeout overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTimeouts {
    #[serde(with = "humantime_serde")]
    pub startup: Option<Duration>,

    #[serde(with = "humantime_serde")]
    pub liveness: Option<Duration>,

    #[serde(with = "humantime_serde")]
    pub readiness: Option<Duration>,
}

/// Settings accepted by [`crate::HealthService`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied to probes with no category or probe override
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    pub timeouts: CategoryTimeouts,

    /// Maximum number of probes running at once; unbounded when unset
    pub max_concurrency: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            timeouts: CategoryTimeouts::default(),
            max_concurrency: None,
        }
    }
}

impl EngineConfig {
    /// Default timeout for probes in `category`
    pub fn timeout_for(&self, category: Category) -> Duration {
        let specific = match category {
            Category::Startup => self.timeouts.startup,
            Category::Liveness => self.timeouts.liveness,
            Category::Readiness => self.timeouts.readiness,
        };
        specific.unwrap_or(self.default_timeout)
    }
}
