//! Tracing and logging setup.
//!
//! Call [setup_tracing] once at startup. The console filter is taken from
//! `RUST_LOG` if present, otherwise from the `level` field of the JSON
//! variable `cfkit_logging`:
//!
//! ```text
//! cfkit_logging={"level": "INFO"}
//! ```
//!
//! Known levels are `TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR` and the aliases
//! `WARNING`, `PANIC` and `FATAL` (the latter two map to `ERROR`), in any
//! case. Anything else, including no level at all, logs at `DEBUG`.
//!
//! With the `open_telemetry` feature, spans are also exported via OTLP when
//! `cfkit_telemetry` enables it (see [otel]).

use crate::config::{EnvRecord, RecordBinder, Settings};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

mod production;

#[cfg(feature = "open_telemetry")]
pub mod otel;

/// Level used when none or an unknown one is configured.
pub const DEFAULT_LEVEL: &str = "debug";

#[derive(Debug, Default)]
pub struct LoggingEnv {
    pub level: String,
}

impl EnvRecord for LoggingEnv {
    fn bind(binder: &mut RecordBinder<Self>) {
        binder.string("cfkit_logging.level", |env, level| env.level = level);
    }
}

/// Installs the global subscriber with console output and, if enabled,
/// OpenTelemetry export.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
#[cfg(feature = "open_telemetry")]
pub fn setup_tracing(settings: &Settings) {
    let console_layer = setup_console_layer(settings);

    match otel::setup_open_telemetry_layer(settings) {
        Ok(otlp_layer) => {
            Registry::default()
                .with(console_layer)
                .with(otlp_layer)
                .init();

            tracing::info!(
                "Tracing initialized successfully [reporting to console as well as OpenTelemetry]"
            );
        }
        Err(err) => {
            Registry::default().with(console_layer).init();
            tracing::info!("Tracing initialized successfully [reporting to console only]");
            tracing::info!("Skipping OpenTelemetry setup: {:#}", err);
        }
    }
}

/// Installs the global subscriber with console output.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
#[cfg(not(feature = "open_telemetry"))]
pub fn setup_tracing(settings: &Settings) {
    let console_layer = setup_console_layer(settings);
    Registry::default().with(console_layer).init();
    tracing::info!("Tracing initialized successfully [reporting to console only]");
}

fn setup_console_layer(settings: &Settings) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured_level(settings)));

    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(production::ProductionLogFormat::new(
            settings.application_name(),
        ))
        .with_filter(filter)
        .boxed()
}

/// The console level configured in `cfkit_logging`.
pub fn configured_level(settings: &Settings) -> &'static str {
    settings
        .parse::<LoggingEnv>()
        .ok()
        .and_then(|env| normalize_level(&env.level))
        .unwrap_or(DEFAULT_LEVEL)
}

fn normalize_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "panic" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}
