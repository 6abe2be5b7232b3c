//! Where raw environment values come from.

use std::collections::HashMap;
use std::env;

/// Supplies the raw text of environment variables.
///
/// Unset variables read as the empty string, which then degrades to an
/// empty string value in the resolver rather than to an error.
pub trait EnvironmentSource: Send + Sync {
    fn var(&self, name: &str) -> String;
}

/// Reads from the environment of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, name: &str) -> String {
        env::var(name).unwrap_or_default()
    }
}

/// A fixed set of variables, independent of the process environment.
#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl EnvironmentSource for StaticEnvironment {
    fn var(&self, name: &str) -> String {
        self.vars.get(name).cloned().unwrap_or_default()
    }
}
