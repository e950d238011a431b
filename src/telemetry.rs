use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, TelemetryConfig};

fn otel_tracer(service_name: &str, endpoint: &str) -> Option<sdktrace::Tracer> {
    let resource = Resource::new(vec![KeyValue::new(
        resource::SERVICE_NAME,
        service_name.to_string(),
    )]);

    let installed = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::config()
                .with_resource(resource)
                .with_sampler(sdktrace::Sampler::AlwaysOn),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio);

    match installed {
        Ok(tracer) => Some(tracer),
        Err(e) => {
            // The subscriber isn't up yet, so tracing macros would go nowhere.
            eprintln!("OpenTelemetry exporter disabled: {e}");
            None
        }
    }
}

/// Installs the global subscriber: env-filtered text or flattened JSON logs,
/// plus OTLP span export when an endpoint is configured.
pub fn init_telemetry(service_name: &str, config: &TelemetryConfig) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(&config.log_filter));

    let otel_layer = config
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| otel_tracer(service_name, endpoint))
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json().flatten_event(true);
            registry.with(otel_layer).with(fmt_layer).init();
        }
        LogFormat::Text => {
            registry.with(otel_layer).with(tracing_subscriber::fmt::layer()).init();
        }
    }
}
