//! Tracing setup with optional OpenTelemetry export.
//!
//! Logs always go to stdout (text or JSON). When telemetry is enabled in
//! config, spans are additionally exported to an OTLP collector over gRPC.

use crate::config::{LoggingSettings, TelemetrySettings};
use common::logging::{self, LogFormat};
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, Tracer, TracerProvider},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Create an OTLP tracer and install its provider globally
pub fn init_tracer(service_name: &str, otlp_endpoint: &str) -> common::Result<Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()
        .map_err(common::Error::telemetry)?;

    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build();

    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);
    Ok(tracer)
}

/// Install the global tracing subscriber.
///
/// Must run inside a tokio runtime when telemetry is enabled. The
/// returned guard must be kept alive for the duration of the program.
pub fn setup_tracing(
    logging_settings: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> common::Result<Option<TelemetryGuard>> {
    let level = logging_settings.level.as_deref().unwrap_or("info");
    let format = LogFormat::parse(logging_settings.format.as_deref());

    if !telemetry.enabled {
        logging::init_with(format, level);
        tracing::info!("Tracing initialized without OpenTelemetry");
        return Ok(None);
    }

    let tracer = init_tracer(&telemetry.service_name, &telemetry.otlp_endpoint)?;
    let registry = tracing_subscriber::registry().with(logging::filter(level));

    let installed = match format {
        LogFormat::Text => registry
            .with(fmt::layer())
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init(),
    };
    installed.map_err(common::Error::telemetry)?;

    tracing::info!(
        service_name = %telemetry.service_name,
        otlp_endpoint = %telemetry.otlp_endpoint,
        "Tracing initialized with OpenTelemetry integration"
    );

    Ok(Some(TelemetryGuard))
}
