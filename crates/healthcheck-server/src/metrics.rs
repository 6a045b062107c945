//! Prometheus metrics for health evaluations.

use healthcheck::{AggregateResult, Category};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for per-probe metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// Probe name
    pub probe: String,
    /// Category the probe belongs to
    pub category: String,
}

/// Labels for probe run metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RunLabels {
    pub probe: String,
    pub category: String,
    /// UP or DOWN
    pub status: String,
}

/// Labels for probe fault metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FaultLabels {
    pub probe: String,
    pub category: String,
    /// timeout or error
    pub kind: String,
}

/// Labels for category-level metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CategoryLabels {
    /// Category name, or "all" for combined evaluations
    pub category: String,
}

type HistogramFamily<L> = Family<L, Histogram, fn() -> Histogram>;

fn probe_duration_histogram() -> Histogram {
    // 1ms to ~16s
    Histogram::new(exponential_buckets(0.001, 2.0, 15))
}

/// Metrics registry with all health evaluation metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    probe_runs_total: Family<RunLabels, Counter>,
    probe_duration_seconds: HistogramFamily<ProbeLabels>,
    probe_faults_total: Family<FaultLabels, Counter>,
    /// 1=UP, 0=DOWN
    category_status: Family<CategoryLabels, Gauge>,
    evaluation_duration_seconds: HistogramFamily<CategoryLabels>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probe_runs_total = Family::<RunLabels, Counter>::default();
        registry.register(
            "healthcheck_probe_runs",
            "Total probe invocations by resulting status",
            probe_runs_total.clone(),
        );

        let probe_duration_seconds: HistogramFamily<ProbeLabels> =
            Family::new_with_constructor(probe_duration_histogram);
        registry.register(
            "healthcheck_probe_duration_seconds",
            "Probe wall-clock duration in seconds",
            probe_duration_seconds.clone(),
        );

        let probe_faults_total = Family::<FaultLabels, Counter>::default();
        registry.register(
            "healthcheck_probe_faults",
            "Probe timeouts and errors",
            probe_faults_total.clone(),
        );

        let category_status = Family::<CategoryLabels, Gauge>::default();
        registry.register(
            "healthcheck_category_status",
            "Last evaluated category status (1=UP, 0=DOWN)",
            category_status.clone(),
        );

        let evaluation_duration_seconds: HistogramFamily<CategoryLabels> =
            Family::new_with_constructor(probe_duration_histogram);
        registry.register(
            "healthcheck_evaluation_duration_seconds",
            "Category evaluation duration in seconds",
            evaluation_duration_seconds.clone(),
        );

        Self {
            registry,
            probe_runs_total,
            probe_duration_seconds,
            probe_faults_total,
            category_status,
            evaluation_duration_seconds,
        }
    }

    /// Record every outcome of a category evaluation
    pub fn record_result(&self, category: Category, result: &AggregateResult) {
        let category_name = category.as_str().to_string();

        for outcome in &result.checks {
            self.probe_runs_total
                .get_or_create(&RunLabels {
                    probe: outcome.name.clone(),
                    category: category_name.clone(),
                    status: outcome.status.to_string(),
                })
                .inc();

            self.probe_duration_seconds
                .get_or_create(&ProbeLabels {
                    probe: outcome.name.clone(),
                    category: category_name.clone(),
                })
                .observe(outcome.duration.as_secs_f64());

            if let Some(kind) = outcome.fault {
                self.probe_faults_total
                    .get_or_create(&FaultLabels {
                        probe: outcome.name.clone(),
                        category: category_name.clone(),
                        kind: kind.as_str().to_string(),
                    })
                    .inc();
            }
        }

        self.set_status(&category_name, result.is_up());
    }

    /// Record how long an evaluation took; `scope` is a category name or "all"
    pub fn record_evaluation(&self, scope: &str, elapsed: Duration) {
        self.evaluation_duration_seconds
            .get_or_create(&CategoryLabels {
                category: scope.to_string(),
            })
            .observe(elapsed.as_secs_f64());
    }

    /// Update the status gauge for `scope`
    pub fn set_status(&self, scope: &str, up: bool) {
        self.category_status
            .get_or_create(&CategoryLabels {
                category: scope.to_string(),
            })
            .set(if up { 1 } else { 0 });
    }

    /// Encode in Prometheus text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
