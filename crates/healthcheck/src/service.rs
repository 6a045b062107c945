//! Query façade composing registry, executor and aggregator.

use crate::aggregator;
use crate::config::EngineConfig;
use crate::executor::Executor;
use crate::registry::Registry;
use crate::types::{AggregateResult, Category};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// Answers "what is the status of category C right now".
///
/// Stateless between calls: every evaluation re-runs the probes
/// registered at the moment it starts.
#[derive(Clone)]
pub struct HealthService {
    registry: Arc<Registry>,
    executor: Executor,
    config: EngineConfig,
}

impl HealthService {
    pub fn new(registry: Arc<Registry>, config: EngineConfig) -> Self {
        let executor = match config.max_concurrency {
            Some(max) => Executor::bounded(max),
            None => Executor::new(),
        };

        Self {
            registry,
            executor,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every probe in `category` and reduce the outcomes.
    pub async fn evaluate(&self, category: Category) -> AggregateResult {
        let span = info_span!("evaluate", %category);

        async move {
            let probes = self.registry.snapshot(category);
            let start = Instant::now();

            let outcomes = self
                .executor
                .run(&probes, self.config.timeout_for(category))
                .await;
            let result = aggregator::reduce(outcomes);

            debug!(
                status = %result.status,
                probes = result.checks.len(),
                duration_ms = start.elapsed().as_millis(),
                "Category evaluated"
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Evaluate every category concurrently.
    pub async fn evaluate_all(&self) -> BTreeMap<Category, AggregateResult> {
        let results = join_all(Category::ALL.iter().map(|&c| self.evaluate(c))).await;
        Category::ALL.into_iter().zip(results).collect()
    }

    /// Single result across all categories.
    ///
    /// Checks are listed by category (startup, liveness, readiness), then
    /// in registration order.
    pub async fn evaluate_combined(&self) -> AggregateResult {
        aggregator::combine(self.evaluate_all().await.into_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::FnProbe;
    use crate::types::{Report, Status};

    #[tokio::test]
    async fn test_evaluate_empty_category() {
        let service = HealthService::new(Arc::new(Registry::new()), EngineConfig::default());
        let result = service.evaluate(Category::Startup).await;
        assert_eq!(result.status, Status::Up);
        assert!(result.checks.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_combined_orders_by_category() {
        let registry = Arc::new(Registry::new());
        for (name, category, up) in [
            ("ready", Category::Readiness, true),
            ("live", Category::Liveness, false),
            ("started", Category::Startup, true),
        ] {
            registry
                .register(Arc::new(FnProbe::new(name, category, move || async move {
                    Ok(Report::from_bool(up))
                })))
                .unwrap();
        }

        let service = HealthService::new(registry, EngineConfig::default());

        let all = service.evaluate_all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[&Category::Liveness].status, Status::Down);
        assert_eq!(all[&Category::Readiness].status, Status::Up);

        let combined = service.evaluate_combined().await;
        assert_eq!(combined.status, Status::Down);
        let names: Vec<_> = combined.checks.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["started", "live", "ready"]);
    }
}
