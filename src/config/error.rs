use thiserror::Error;

/// Failures surfaced by the resolver.
///
/// Absent variables, absent paths and values that are not valid JSON are not
/// errors. They degrade to empty or default values in the accessors instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A record field could not be bound to its environment path.
    #[error("cannot bind '{path}': {reason}")]
    Binding { path: String, reason: String },

    /// None of the candidate names resolved to a bound service.
    #[error("no service bound for any of [{}]", .candidates.join(", "))]
    RequiredServiceMissing { candidates: Vec<String> },

    /// The service was resolved but lacks a required credential.
    #[error("service '{service}' provides no credential '{key}'")]
    MissingCredential { service: String, key: String },
}

impl ConfigError {
    pub(crate) fn binding(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Binding {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
