//! OTLP span export.
//!
//! Configured by the JSON variable `cfkit_telemetry`:
//!
//! ```text
//! cfkit_telemetry={"enable": true, "name": "orders", "endpoint": "http://collector:4317"}
//! ```
//!
//! `name` defaults to the application name of `VCAP_APPLICATION` and
//! `endpoint` to `OTEL_EXPORTER_OTLP_ENDPOINT`. The trace filter comes from
//! `RUST_TRACE` and defaults to `debug`.

use crate::config::{EnvRecord, ROOT, RecordBinder, Settings};
use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

const FALLBACK_SERVICE_NAME: &str = "cfkit";

#[derive(Debug, Default)]
pub struct TelemetryEnv {
    pub enable: bool,
    pub name: String,
    pub endpoint: String,
}

impl EnvRecord for TelemetryEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder
            .bool("cfkit_telemetry.enable", |env, enable| env.enable = enable)
            .string("cfkit_telemetry.name", |env, name| env.name = name)
            .string("cfkit_telemetry.endpoint", |env, endpoint| {
                env.endpoint = endpoint
            });
    }
}

impl TelemetryEnv {
    fn service_name(&self, settings: &Settings) -> String {
        [self.name.clone(), settings.application_name()]
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_SERVICE_NAME.to_owned())
    }

    fn endpoint(&self, settings: &Settings) -> Option<String> {
        [
            self.endpoint.clone(),
            settings.get_string("OTEL_EXPORTER_OTLP_ENDPOINT", ROOT),
        ]
        .into_iter()
        .find(|endpoint| !endpoint.is_empty())
    }
}

pub fn setup_open_telemetry_layer<S>(settings: &Settings) -> anyhow::Result<impl Layer<S>>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let env: TelemetryEnv = settings.parse()?;
    if !env.enable {
        anyhow::bail!("OpenTelemetry is not enabled in cfkit_telemetry");
    }

    let endpoint = env.endpoint(settings).context(
        "No OpenTelemetry endpoint present in cfkit_telemetry or OTEL_EXPORTER_OTLP_ENDPOINT",
    )?;
    let service_name = env.service_name(settings);

    let provider = setup_open_telemetry(endpoint, service_name.clone())?;
    let tracer = provider.tracer(service_name);
    let filter = EnvFilter::try_from_env("RUST_TRACE").unwrap_or_else(|_| EnvFilter::new("debug"));

    Ok(OpenTelemetryLayer::new(tracer).with_filter(filter))
}

fn setup_open_telemetry(endpoint: String, service_name: String) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()
        .with_context(|| format!("Failed to build OpenTelemetry exporter for: {}", endpoint))?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(
            Resource::builder_empty()
                .with_attributes([KeyValue::new("service.name", service_name)])
                .build(),
        )
        .build();

    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    Ok(tracer_provider)
}
