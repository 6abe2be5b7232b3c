//! Populates configuration records from environment paths.
//!
//! A record lists its fields once, each with the path expression it is read
//! from and the coercion to apply:
//!
//! ```rust,ignore
//! #[derive(Debug, Default)]
//! struct PoolEnv {
//!     name: String,
//!     max_open: i64,
//!     show_sql: bool,
//! }
//!
//! impl EnvRecord for PoolEnv {
//!     fn bind(binder: &mut RecordBinder<Self>) {
//!         binder
//!             .string("cfkit_postgres.name", |env, value| env.name = value)
//!             .int("cfkit_postgres.connection.max_open", |env, value| env.max_open = value)
//!             .bool("cfkit_postgres.show_sql", |env, value| env.show_sql = value);
//!     }
//! }
//!
//! let env: PoolEnv = settings.parse()?;
//! ```
//!
//! Values are coerced like the `get_*` accessors of
//! [Settings](crate::config::Settings): absent or malformed values become
//! empty strings, `false` or `0`.

use crate::config::error::ConfigError;
use crate::config::path::PathExpr;
use crate::config::settings::Settings;

/// A record which can be filled by [Settings::parse].
pub trait EnvRecord: Sized {
    /// Registers every field which is read from the environment.
    fn bind(binder: &mut RecordBinder<Self>);
}

type Setter<T, V> = Box<dyn Fn(&mut T, V)>;

enum Coercion<T> {
    String(Setter<T, String>),
    Bool(Setter<T, bool>),
    Int(Setter<T, i64>),
    Strings(Setter<T, Vec<String>>),
}

struct FieldBinding<T> {
    path: Result<PathExpr, ConfigError>,
    coercion: Coercion<T>,
}

/// Collects the field registrations of one record type.
pub struct RecordBinder<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T> RecordBinder<T> {
    pub(crate) fn new() -> Self {
        Self { fields: Vec::new() }
    }

    fn register(&mut self, expression: &str, coercion: Coercion<T>) -> &mut Self {
        self.fields.push(FieldBinding {
            path: PathExpr::parse(expression),
            coercion,
        });
        self
    }

    pub fn string(
        &mut self,
        expression: &str,
        setter: impl Fn(&mut T, String) + 'static,
    ) -> &mut Self {
        self.register(expression, Coercion::String(Box::new(setter)))
    }

    pub fn bool(&mut self, expression: &str, setter: impl Fn(&mut T, bool) + 'static) -> &mut Self {
        self.register(expression, Coercion::Bool(Box::new(setter)))
    }

    pub fn int(&mut self, expression: &str, setter: impl Fn(&mut T, i64) + 'static) -> &mut Self {
        self.register(expression, Coercion::Int(Box::new(setter)))
    }

    /// A list read from a JSON array or a comma separated string.
    pub fn strings(
        &mut self,
        expression: &str,
        setter: impl Fn(&mut T, Vec<String>) + 'static,
    ) -> &mut Self {
        self.register(expression, Coercion::Strings(Box::new(setter)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn apply(self, settings: &Settings, record: &mut T) -> Result<(), ConfigError> {
        let fields = self
            .fields
            .into_iter()
            .map(|field| field.path.map(|path| (path, field.coercion)))
            .collect::<Result<Vec<_>, _>>()?;

        for (expression, coercion) in fields {
            let name = expression.name.as_str();
            let path = expression.path.as_slice();

            match coercion {
                Coercion::String(set) => set(&mut *record, settings.get_string(name, path)),
                Coercion::Bool(set) => set(&mut *record, settings.get_bool(name, path)),
                Coercion::Int(set) => set(&mut *record, settings.get_int(name, path)),
                Coercion::Strings(set) => set(&mut *record, settings.get_strings(name, path)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source::StaticEnvironment;

    #[derive(Debug, Default, PartialEq)]
    struct SearchEnv {
        urls: Vec<String>,
        healthcheck: bool,
        scheme: String,
        timeout: i64,
        untouched: String,
    }

    impl EnvRecord for SearchEnv {
        fn bind(binder: &mut RecordBinder<Self>) {
            binder
                .strings("search.urls", |env, value| env.urls = value)
                .bool("search.healthcheck.enable", |env, value| env.healthcheck = value)
                .string("search.sniff.scheme", |env, value| env.scheme = value)
                .int("TIMEOUT", |env, value| env.timeout = value);
        }
    }

    #[derive(Debug, Default)]
    struct BrokenEnv {
        name: String,
        port: i64,
    }

    impl EnvRecord for BrokenEnv {
        fn bind(binder: &mut RecordBinder<Self>) {
            binder
                .int("PORT", |env, value| env.port = value)
                .string("broken..name", |env, value| env.name = value);
        }
    }

    fn settings() -> Settings {
        Settings::with_source(
            StaticEnvironment::new()
                .with(
                    "search",
                    r#"{"urls": ["http://a:9200", "http://b:9200"],
                        "healthcheck": {"enable": "true"},
                        "sniff": {"scheme": "https"}}"#,
                )
                .with("TIMEOUT", "30")
                .with("PORT", "8080"),
        )
    }

    #[test]
    fn binds_every_registered_field() {
        let env: SearchEnv = settings().parse().unwrap();
        assert_eq!(
            env,
            SearchEnv {
                urls: vec!["http://a:9200".to_owned(), "http://b:9200".to_owned()],
                healthcheck: true,
                scheme: "https".to_owned(),
                timeout: 30,
                untouched: String::new(),
            }
        );
    }

    #[test]
    fn absent_values_bind_to_defaults() {
        let settings = Settings::with_source(StaticEnvironment::new());
        let mut env = SearchEnv {
            untouched: "keep".to_owned(),
            ..SearchEnv::default()
        };
        settings.parse_into(&mut env).unwrap();

        assert!(env.urls.is_empty());
        assert!(!env.healthcheck);
        assert_eq!(env.scheme, "");
        assert_eq!(env.timeout, 0);
        assert_eq!(env.untouched, "keep");
    }

    #[test]
    fn malformed_expressions_fail_before_assignment() {
        let mut env = BrokenEnv::default();
        let err = settings().parse_into(&mut env).unwrap_err();

        assert!(matches!(err, ConfigError::Binding { ref path, .. } if path == "broken..name"));
        assert_eq!(env.port, 0);
        assert_eq!(env.name, "");
    }

    #[test]
    fn counts_registrations() {
        let mut binder = RecordBinder::<SearchEnv>::new();
        assert!(binder.is_empty());
        SearchEnv::bind(&mut binder);
        assert_eq!(binder.len(), 4);
    }
}
