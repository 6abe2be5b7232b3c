//! Environment backed configuration.
//!
//! [Settings] reads environment variables holding plain strings or JSON
//! documents, caches the decoded values and offers typed access to nested
//! parts of them:
//!
//! ```rust,ignore
//! // cfkit_postgres={"connection": {"max_open": 16}}
//! let settings = Settings::shared();
//! let max_open = settings.get_int("cfkit_postgres", &["connection", "max_open"]);
//! ```
//!
//! It also resolves bound services from `VCAP_SERVICES` by name, label or
//! tag (see [services]), and fills whole records through the [binder].
//!
//! Lookups for optional settings never fail: absent or malformed values
//! yield `None` from the `try_*` accessors and a default from the `get_*`
//! ones. Only lookups of required connectivity, like
//! [Settings::service_uri], report a [ConfigError].

pub mod binder;
pub mod cache;
pub mod coerce;
pub mod error;
pub mod path;
pub mod services;
pub mod settings;
pub mod source;

pub use binder::{EnvRecord, RecordBinder};
pub use cache::{disable_caching, enable_caching, is_caching_enabled};
pub use error::ConfigError;
pub use path::{PathExpr, ROOT, traverse};
pub use services::{ServiceCatalog, ServiceDescriptor};
pub use settings::Settings;
pub use source::{EnvironmentSource, ProcessEnvironment, StaticEnvironment};
