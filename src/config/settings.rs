//! The caching resolver behind all typed lookups and service resolution.

use crate::config::binder::{EnvRecord, RecordBinder};
use crate::config::cache::{Cache, is_caching_enabled};
use crate::config::coerce;
use crate::config::error::ConfigError;
use crate::config::path::traverse;
use crate::config::services::{SERVICES_VARIABLE, ServiceCatalog, ServiceDescriptor};
use crate::config::source::{EnvironmentSource, ProcessEnvironment};
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

/// Name of the variable describing the running application.
pub const APPLICATION_VARIABLE: &str = "VCAP_APPLICATION";

const POSTGRES_LABELS: &[&str] = &["postgres"];
const RABBITMQ_LABELS: &[&str] = &["rabbitmq-36", "p-rabbitmq-35"];

static SHARED: LazyLock<Arc<Settings>> = LazyLock::new(|| Arc::new(Settings::new()));

/// Resolves environment variables and bound services.
///
/// Variables may hold plain strings or JSON documents. Each variable is
/// read and decoded once, on first use, and served from the cache
/// afterwards. A value which is not valid JSON is kept as a string.
///
/// All lookups of one instance are serialized by a single lock, held while
/// reading and decoding on a miss, so concurrent callers never decode the
/// same variable twice.
pub struct Settings {
    source: Arc<dyn EnvironmentSource>,
    cache: Mutex<Cache>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("cached", &self.cached_keys())
            .finish()
    }
}

impl Settings {
    /// Settings backed by the environment of this process.
    pub fn new() -> Self {
        Self::with_source(ProcessEnvironment)
    }

    pub fn with_source(source: impl EnvironmentSource + 'static) -> Self {
        Settings {
            source: Arc::new(source),
            cache: Mutex::new(Cache::default()),
        }
    }

    /// A process-wide instance backed by the process environment.
    ///
    /// Components which accept a `&Settings` should be handed this one
    /// unless they are under test.
    pub fn shared() -> Arc<Settings> {
        SHARED.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        // A panic while holding the lock cannot leave a half written entry.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The decoded value of the variable `name`.
    ///
    /// Unset variables resolve to an empty string.
    pub fn resolve(&self, name: &str) -> Arc<Value> {
        let mut cache = self.lock();
        self.resolve_with(&mut cache, name)
    }

    fn resolve_with(&self, cache: &mut Cache, name: &str) -> Arc<Value> {
        if !is_caching_enabled() {
            return Arc::new(self.read(name));
        }

        if let Some(value) = cache.env(name) {
            return value;
        }

        let value = Arc::new(self.read(name));
        cache.store_env(name, value.clone());
        value
    }

    fn read(&self, name: &str) -> Value {
        let raw = self.source.var(name);
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                tracing::trace!("Resolved '{}' as JSON", name);
                value
            }
            Err(_) => {
                tracing::trace!("Resolved '{}' as plain string", name);
                Value::String(raw)
            }
        }
    }

    /// The value at `path` inside the variable `name`.
    pub fn lookup<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Option<Value> {
        let root = self.resolve(name);
        traverse(path, &root).cloned()
    }

    pub fn try_string<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Option<String> {
        coerce::as_string(self.lookup(name, path).as_ref())
    }

    pub fn try_bool<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Option<bool> {
        coerce::as_bool(self.lookup(name, path).as_ref())
    }

    pub fn try_int<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Option<i64> {
        coerce::as_int(self.lookup(name, path).as_ref())
    }

    pub fn try_strings<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Option<Vec<String>> {
        coerce::as_strings(self.lookup(name, path).as_ref())
    }

    /// The value as string, empty if absent.
    pub fn get_string<S: AsRef<str>>(&self, name: &str, path: &[S]) -> String {
        self.try_string(name, path).unwrap_or_default()
    }

    /// The value as boolean, `false` if absent or not a boolean literal.
    pub fn get_bool<S: AsRef<str>>(&self, name: &str, path: &[S]) -> bool {
        self.try_bool(name, path).unwrap_or(false)
    }

    /// The value as integer, `0` if absent or not an integer.
    pub fn get_int<S: AsRef<str>>(&self, name: &str, path: &[S]) -> i64 {
        self.try_int(name, path).unwrap_or(0)
    }

    pub fn get_strings<S: AsRef<str>>(&self, name: &str, path: &[S]) -> Vec<String> {
        self.try_strings(name, path).unwrap_or_default()
    }

    /// `application_name` of `VCAP_APPLICATION`, empty if not running on the platform.
    pub fn application_name(&self) -> String {
        self.get_string(APPLICATION_VARIABLE, &["application_name"])
    }

    /// The first candidate which names a bound service.
    ///
    /// Each candidate is matched against the service names first and then
    /// against labels and tags. Empty candidates are skipped, later
    /// candidates are only consulted if all earlier ones resolve to nothing.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn resolve_service<S: AsRef<str>>(
        &self,
        candidates: &[S],
    ) -> Option<Arc<ServiceDescriptor>> {
        candidates
            .iter()
            .map(|candidate| candidate.as_ref())
            .filter(|candidate| !candidate.is_empty())
            .find_map(|candidate| {
                let service = self.find_service(candidate);
                if let Some(service) = &service {
                    tracing::debug!("Candidate '{}' resolved to service '{}'", candidate, service.name);
                }
                service
            })
    }

    fn find_service(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
        let mut cache = self.lock();

        if is_caching_enabled()
            && let Some(service) = cache.service(name)
        {
            return service;
        }

        let catalog = ServiceCatalog::from_value(&self.resolve_with(&mut cache, SERVICES_VARIABLE));
        let service = catalog.find(name).cloned().map(Arc::new);

        if is_caching_enabled() {
            cache.store_service(name, service.clone());
        }

        service
    }

    /// Like [Self::resolve_service], but a missing service is an error.
    pub fn require_service<S: AsRef<str>>(
        &self,
        candidates: &[S],
    ) -> Result<Arc<ServiceDescriptor>, ConfigError> {
        self.resolve_service(candidates)
            .ok_or_else(|| ConfigError::RequiredServiceMissing {
                candidates: candidates
                    .iter()
                    .map(|candidate| candidate.as_ref().to_owned())
                    .collect(),
            })
    }

    /// The `uri` credential of the first resolvable candidate.
    pub fn service_uri<S: AsRef<str>>(&self, candidates: &[S]) -> Result<String, ConfigError> {
        self.require_service(candidates)?.require_credential("uri")
    }

    /// Service URI trying `candidates` before the stock postgres label.
    pub fn postgres_uri<S: AsRef<str>>(&self, candidates: &[S]) -> Result<String, ConfigError> {
        self.service_uri(with_fallbacks(candidates, POSTGRES_LABELS).as_slice())
    }

    /// Service URI trying `candidates` before the stock RabbitMQ labels.
    pub fn rabbitmq_uri<S: AsRef<str>>(&self, candidates: &[S]) -> Result<String, ConfigError> {
        self.service_uri(with_fallbacks(candidates, RABBITMQ_LABELS).as_slice())
    }

    /// Builds a record from the paths it registers.
    pub fn parse<T: EnvRecord + Default>(&self) -> Result<T, ConfigError> {
        let mut record = T::default();
        self.parse_into(&mut record)?;
        Ok(record)
    }

    /// Assigns every registered field of `record`.
    ///
    /// All path expressions are validated before the first field is touched.
    pub fn parse_into<T: EnvRecord>(&self, record: &mut T) -> Result<(), ConfigError> {
        let mut binder = RecordBinder::new();
        T::bind(&mut binder);
        binder.apply(self, record)
    }

    /// Drops everything resolved so far.
    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    /// Keys of the cached entries, `env_` or `service_` prefixed.
    pub fn cached_keys(&self) -> Vec<String> {
        self.lock().keys()
    }
}

fn with_fallbacks<'a, S: AsRef<str>>(candidates: &'a [S], fallbacks: &[&'a str]) -> Vec<&'a str> {
    candidates
        .iter()
        .map(|candidate| candidate.as_ref())
        .chain(fallbacks.iter().copied())
        .collect()
}
