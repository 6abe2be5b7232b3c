//! # cfkit
//!
//! Configuration for applications running on Cloud Foundry style platforms.
//!
//! Settings live in environment variables, either as plain strings or as
//! JSON documents. Bound backing services are published by the platform in
//! `VCAP_SERVICES`. cfkit resolves both through a caching [config::Settings]
//! and wires a small set of integrations on top of it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cfkit::config::Settings;
//! use cfkit::web::info_service::get_info_route;
//! use cfkit::web::warp::run_webserver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::shared();
//!     cfkit::logging::setup_tracing(&settings);
//!
//!     let database_uri = settings.postgres_uri(&["orders-db"])?;
//!     let routes = get_info_route(settings.clone());
//!     run_webserver(routes, &settings).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Environment resolution, service lookup and record binding
//! - [`logging`] - Tracing setup with optional OpenTelemetry export
//! - [`tools`] - Graceful shutdown handling
//! - `blobstore` - S3 compatible object storage (feature-gated)
//! - `postgres` - Postgres connection pool (feature-gated)
//! - `opensearch` - OpenSearch client (feature-gated)
//! - `web` - HTTP server and info endpoint (feature-gated)
//!
//! ## Feature Flags
//!
//! - `open_telemetry` - OpenTelemetry tracing export
//! - `blobstore` - S3 client bound to a service binding
//! - `postgres` - sqlx pool bound to a service binding
//! - `open_search` - OpenSearch client
//! - `web` - warp based HTTP server
//!
//! ## Environment Variables
//!
//! ### Platform
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VCAP_SERVICES` | Bound services, keyed by label | (none) |
//! | `VCAP_APPLICATION` | Application metadata (`application_name`, `application_version`, `instance_index`) | (none) |
//! | `PORT` | HTTP port | `8080` |
//! | `BIND_ADDRESS` | Full HTTP bind address, overrides `PORT` | (none) |
//!
//! ### Logging
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RUST_LOG` | Console log filter | (none) |
//! | `cfkit_logging` | `{"level": ..}`, used if `RUST_LOG` is absent | `debug` |
//! | `cfkit_telemetry` | `{"enable": .., "name": .., "endpoint": ..}` | disabled |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP endpoint if `cfkit_telemetry` names none | (none) |
//! | `RUST_TRACE` | Filter for exported spans | `debug` |
//!
//! ### Integrations
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `cfkit_blobstore` | `{"name": ..}` selecting the blob store service |
//! | `cfkit_postgres` | `{"name": .., "connection": {"max_open": .., "max_idle": ..}, "orm": {"show_sql": ..}}` |
//! | `cfkit_opensearch` | `{"urls": [..], "user": .., "password": .., "healthcheck": {"enable": ..}, "name": ..}` |

pub mod config;
pub mod logging;
pub mod tools;

#[cfg(feature = "blobstore")]
pub mod blobstore;
#[cfg(feature = "open_search")]
pub mod opensearch;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "web")]
pub mod web;
